use std::fmt;

/// A runtime operand. Every value in this VM is an IEEE-754 double.
pub type Value = f64;

/// Significant digits used when printing values, matching C's `%g`.
const PRECISION: i32 = 6;

/// Append-only constant pool. Indices handed out by [`ValueArray::write`]
/// stay valid for the lifetime of the array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueArray {
    values: Vec<Value>,
}

impl ValueArray {
    pub fn new() -> Self {
        ValueArray { values: Vec::new() }
    }

    /// Append a value and return its index.
    pub fn write(&mut self, value: Value) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Display adapter that renders a [`Value`] the way `printf("%g")` does:
/// six significant digits, trailing zeros trimmed, exponent form for very
/// large or very small magnitudes.
#[derive(Debug, Clone, Copy)]
pub struct Printed(pub Value);

impl fmt::Display for Printed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_g(self.0))
    }
}

fn format_g(v: Value) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Round to PRECISION significant digits first; the exponent of the rounded
    // value decides between fixed and exponent notation.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp) as usize;
        trim_zeros(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
