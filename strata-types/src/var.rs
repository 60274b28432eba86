use std::fmt;

use serde::{Deserialize, Serialize};

/// A property value. Every property in a project is one of these leaf kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Var {
    #[default]
    Void,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Var {
    pub fn is_void(&self) -> bool {
        matches!(self, Var::Void)
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Var::Void => false,
            Var::Bool(b) => *b,
            Var::Int(i) => *i != 0,
            Var::Float(f) => *f != 0.0,
            Var::Str(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            Var::Void => 0,
            Var::Bool(b) => *b as i64,
            Var::Int(i) => *i,
            Var::Float(f) => *f as i64,
            Var::Str(s) => s.trim().parse().unwrap_or(0),
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            Var::Void => 0.0,
            Var::Bool(b) => *b as i64 as f64,
            Var::Int(i) => *i as f64,
            Var::Float(f) => *f,
            Var::Str(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Var::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Void => Ok(()),
            Var::Bool(b) => write!(f, "{}", b),
            Var::Int(i) => write!(f, "{}", i),
            Var::Float(x) => write!(f, "{}", x),
            Var::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Var {
    fn from(v: bool) -> Self {
        Var::Bool(v)
    }
}

impl From<i32> for Var {
    fn from(v: i32) -> Self {
        Var::Int(v as i64)
    }
}

impl From<i64> for Var {
    fn from(v: i64) -> Self {
        Var::Int(v)
    }
}

impl From<u32> for Var {
    fn from(v: u32) -> Self {
        Var::Int(v as i64)
    }
}

impl From<usize> for Var {
    fn from(v: usize) -> Self {
        Var::Int(v as i64)
    }
}

impl From<f64> for Var {
    fn from(v: f64) -> Self {
        Var::Float(v)
    }
}

impl From<&str> for Var {
    fn from(v: &str) -> Self {
        Var::Str(v.to_string())
    }
}

impl From<String> for Var {
    fn from(v: String) -> Self {
        Var::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_are_lenient() {
        assert!(Var::from("true").as_bool());
        assert!(!Var::Void.as_bool());
        assert_eq!(Var::from("42").as_int(), 42);
        assert_eq!(Var::from(2.5).as_int(), 2);
        assert_eq!(Var::from(true).as_float(), 1.0);
    }

    #[test]
    fn json_keeps_leaf_kinds() {
        let values = vec![
            Var::Void,
            Var::Bool(true),
            Var::Int(-3),
            Var::Float(0.5),
            Var::from("Track 1"),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,true,-3,0.5,"Track 1"]"#);
        let back: Vec<Var> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
