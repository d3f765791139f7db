//! Arithmetic amount expressions.
//!
//! Extraction sometimes splits one priced item ("dinner 180+60+135") into
//! several drafts. The raw text still carries the arithmetic, so we fold it
//! back into a single amount here. Only `+`, `-`, `*` (and `x`/`X` as
//! multiplication) over plain numbers are accepted; anything else is not an
//! expression and must be rejected rather than guessed at.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
}

/// Evaluate an amount expression, or return `None` if the text is not one.
///
/// `x`/`X` are normalized to `*` first. After that, any character outside
/// digits, `+ - * .` and whitespace disqualifies the whole string, as does a
/// malformed shape like `3**2`.
pub fn evaluate(text: &str) -> Option<f64> {
    let normalized: String = text
        .trim()
        .chars()
        .map(|c| if c == 'x' || c == 'X' { '*' } else { c })
        .collect();
    if normalized.is_empty() {
        return None;
    }
    if !normalized
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == '*' || c == '.' || c.is_whitespace())
    {
        return None;
    }
    let compact: String = normalized.chars().filter(|c| !c.is_whitespace()).collect();
    let tokens = tokenize(&compact)?;
    eval_tokens(&tokens)
}

/// Split raw text into (note prefix, evaluated trailing expression), where
/// the expression is everything from the first digit onward. Used by the
/// draft-collapse repair rule.
pub fn split_trailing(text: &str) -> Option<(String, f64)> {
    let idx = text.find(|c: char| c.is_ascii_digit())?;
    let value = evaluate(&text[idx..])?;
    Some((text[..idx].trim().to_string(), value))
}

fn tokenize(s: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            let mut num = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    num.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Num(num.parse().ok()?));
        } else if c == '+' || c == '-' || c == '*' {
            chars.next();
            tokens.push(Token::Op(c));
        } else {
            return None;
        }
    }
    Some(tokens)
}

fn eval_tokens(tokens: &[Token]) -> Option<f64> {
    // Fold unary +/- into the following number, then require a strict
    // Num (Op Num)* shape.
    let mut values = Vec::new();
    let mut ops = Vec::new();
    let mut expect_value = true;
    let mut i = 0;
    while i < tokens.len() {
        match (expect_value, tokens[i]) {
            (true, Token::Num(n)) => {
                values.push(n);
                expect_value = false;
                i += 1;
            }
            (true, Token::Op(sign)) if sign == '+' || sign == '-' => {
                match tokens.get(i + 1) {
                    Some(Token::Num(n)) => {
                        values.push(if sign == '-' { -n } else { *n });
                        expect_value = false;
                        i += 2;
                    }
                    _ => return None,
                }
            }
            (false, Token::Op(op)) => {
                ops.push(op);
                expect_value = true;
                i += 1;
            }
            _ => return None,
        }
    }
    if expect_value || values.len() != ops.len() + 1 {
        return None;
    }

    // * binds tighter than +/-.
    let mut total = 0.0;
    let mut term = values[0];
    for (op, val) in ops.iter().zip(values[1..].iter()) {
        match op {
            '*' => term *= val,
            '+' => {
                total += term;
                term = *val;
            }
            '-' => {
                total += term;
                term = -val;
            }
            _ => return None,
        }
    }
    Some(total + term)
}
