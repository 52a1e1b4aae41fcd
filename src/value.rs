// The dynamic value model (SPEC_FULL.md §3, §4.1).
//
// Grounded on `vm.rs`'s `Value`/`TypeTag` enums and its `operator!` macro,
// which factors "match on the variant pair, TypeError on anything not
// listed" into a declarative table. Brewin's value set is smaller (no
// Float/List/Map/Addr, but an object reference) so the macro is kept but
// trimmed to the five variants this language actually has.

use std::rc::Rc;
use std::cell::RefCell;

use enumflags2::BitFlags;
use lazy_static::lazy_static;
use regex::Regex;

use crate::class::ClassRegistry;
use crate::error::BrewinError;
use crate::object::ObjectInstance;

#[derive(BitFlags, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeTag {
    Int = 0b00001,
    Str = 0b00010,
    Bool = 0b00100,
    Obj = 0b01000,
    Null = 0b10000,
}

impl TypeTag {
    pub const ALL: [TypeTag; 5] = [
        TypeTag::Int,
        TypeTag::Str,
        TypeTag::Bool,
        TypeTag::Obj,
        TypeTag::Null,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Int => "Int",
            TypeTag::Str => "Str",
            TypeTag::Bool => "Bool",
            TypeTag::Obj => "Obj",
            TypeTag::Null => "Null",
        }
    }
}

pub type TypeSet = BitFlags<TypeTag>;

/// A runtime value. `Str` retains its surrounding quote characters (see
/// SPEC_FULL.md §4.1) so that printing and string concatenation stay
/// trivial; every other operator that looks at string *content* strips
/// them on the way in, never on the way out.
#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    Obj(Rc<RefCell<ObjectInstance>>),
    Null,
}

fn expected(expect: TypeSet, got: &Value) -> BrewinError {
    BrewinError::expected(expect, got.type_tag(), 0)
}

fn expected_at(expect: TypeSet, got: &Value, line: usize) -> BrewinError {
    BrewinError::expected(expect, got.type_tag(), line)
}

fn type_mismatch(a: &Value, b: &Value, line: usize) -> BrewinError {
    BrewinError::type_error(
        format!(
            "incompatible operand types {} and {}",
            a.type_tag().name(),
            b.type_tag().name()
        ),
        line,
    )
}

// Factors out the boilerplate of "match the variant pair, TypeError on
// anything not whitelisted" the way `vm.rs`'s `operator!` macro does.
macro_rules! binop {
    ($name:ident { $( $p:pat => $e:expr ),+ $(,)? }) => {
        pub fn $name(&self, other: &Value, line: usize) -> crate::error::Result<Value> {
            use Value::*;
            #[allow(unreachable_patterns)]
            match (self, other) {
                $($p => Ok($e)),+ ,
                (a, b) => Err(type_mismatch(a, b, line)),
            }
        }
    };
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Int(_) => TypeTag::Int,
            Value::Str(_) => TypeTag::Str,
            Value::Bool(_) => TypeTag::Bool,
            Value::Obj(_) => TypeTag::Obj,
            Value::Null => TypeTag::Null,
        }
    }

    /// Convert a raw parser atom to a Value per the §4.1 table. `classes`
    /// is consulted so a bare class name resolves to a typed-null
    /// placeholder rather than a NameError.
    pub fn from_atom(text: &str, line: usize, classes: &ClassRegistry) -> crate::error::Result<Value> {
        lazy_static! {
            static ref INT_SHAPE: Regex = Regex::new(r"^-?[0-9]+$").unwrap();
        }

        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            Ok(Value::Str(text.to_string()))
        } else if text == "true" {
            Ok(Value::Bool(true))
        } else if text == "false" {
            Ok(Value::Bool(false))
        } else if text == "null" {
            Ok(Value::Null)
        } else if INT_SHAPE.is_match(text) {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| BrewinError::type_error(format!("integer literal out of range: {}", text), line))
        } else if classes.classes.contains_key(text) {
            // Typed-null placeholder: a field declared with a class name as
            // its initializer compares equal to Null (SPEC_FULL.md §9) and
            // no separate representation is needed for that.
            Ok(Value::Null)
        } else {
            Err(BrewinError::name_error(format!("unknown name '{}'", text), line))
        }
    }

    /// Render per the printing rules in SPEC_FULL.md §6: quotes stripped
    /// from strings, booleans as bare lexemes, null as `null`.
    pub fn render(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Str(s) => unquoted(s).to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Obj(_) => "object".to_string(),
        }
    }

    pub fn not(&self, line: usize) -> crate::error::Result<Value> {
        match self {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            v => Err(expected_at(TypeTag::Bool.into(), v, line)),
        }
    }

    binop! { add {
        (Int(a), Int(b)) => Int(a + b),
        (Str(a), Str(b)) => Str(concat_quoted(a, b)),
    } }

    binop! { sub { (Int(a), Int(b)) => Int(a - b) } }
    binop! { mul { (Int(a), Int(b)) => Int(a * b) } }

    pub fn div(&self, other: &Value, line: usize) -> crate::error::Result<Value> {
        match (self, other) {
            (Value::Int(_), Value::Int(0)) => {
                Err(BrewinError::type_error("division by zero", line))
            }
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(floor_div(*a, *b))),
            (a, b) => Err(type_mismatch(a, b, line)),
        }
    }

    pub fn modulo(&self, other: &Value, line: usize) -> crate::error::Result<Value> {
        match (self, other) {
            (Value::Int(_), Value::Int(0)) => {
                Err(BrewinError::type_error("division by zero", line))
            }
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(floor_mod(*a, *b))),
            (a, b) => Err(type_mismatch(a, b, line)),
        }
    }

    binop! { lt {
        (Int(a), Int(b)) => Bool(a < b),
        (Str(a), Str(b)) => Bool(unquoted(a) < unquoted(b)),
    } }
    binop! { le {
        (Int(a), Int(b)) => Bool(a <= b),
        (Str(a), Str(b)) => Bool(unquoted(a) <= unquoted(b)),
    } }
    binop! { gt {
        (Int(a), Int(b)) => Bool(a > b),
        (Str(a), Str(b)) => Bool(unquoted(a) > unquoted(b)),
    } }
    binop! { ge {
        (Int(a), Int(b)) => Bool(a >= b),
        (Str(a), Str(b)) => Bool(unquoted(a) >= unquoted(b)),
    } }

    binop! { and {
        (Bool(a), Bool(b)) => Bool(*a && *b),
    } }
    binop! { or {
        (Bool(a), Bool(b)) => Bool(*a || *b),
    } }

    /// `==`/`!=` are defined for every matching-type pair, plus the
    /// Null/Obj cross pairing described in SPEC_FULL.md §4.4 (a live
    /// object reference never equals Null, but comparing one against the
    /// other is not a type error).
    pub fn eq_value(&self, other: &Value, line: usize) -> crate::error::Result<bool> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Null, Value::Null) => Ok(true),
            (Value::Null, Value::Obj(_)) | (Value::Obj(_), Value::Null) => Ok(false),
            (Value::Obj(a), Value::Obj(b)) => Ok(Rc::ptr_eq(a, b)),
            (a, b) => Err(type_mismatch(a, b, line)),
        }
    }
}

/// Strip the stored form's surrounding quotes, the same way `render` does,
/// so ordered comparisons compare string *content* rather than the quoted
/// form (SPEC_FULL.md §4.4: "lexicographic on the unwrapped content").
fn unquoted(s: &str) -> &str {
    if s.len() >= 2 {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn concat_quoted(a: &str, b: &str) -> String {
    let a_body = if a.is_empty() { a } else { &a[..a.len() - 1] };
    let b_body = if b.is_empty() { b } else { &b[1..] };
    format!("{}{}", a_body, b_body)
}

/// Floor division toward negative infinity, unlike Rust's `/` which
/// truncates toward zero. See DESIGN.md for why `div_euclid` doesn't fit:
/// it floors the *remainder*'s sign to match the divisor, not the quotient.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ClassRegistry {
        ClassRegistry { classes: Default::default() }
    }

    #[test]
    fn atom_conversion_shapes() {
        let r = registry();
        assert!(matches!(Value::from_atom("42", 1, &r).unwrap(), Value::Int(42)));
        assert!(matches!(Value::from_atom("-7", 1, &r).unwrap(), Value::Int(-7)));
        assert!(matches!(Value::from_atom("true", 1, &r).unwrap(), Value::Bool(true)));
        assert!(matches!(Value::from_atom("false", 1, &r).unwrap(), Value::Bool(false)));
        assert!(matches!(Value::from_atom("null", 1, &r).unwrap(), Value::Null));
        match Value::from_atom("\"hi\"", 1, &r).unwrap() {
            Value::Str(s) => assert_eq!(s, "\"hi\""),
            _ => panic!("expected Str"),
        }
    }

    #[test]
    fn unknown_name_is_name_error() {
        let r = registry();
        assert!(matches!(
            Value::from_atom("frobnicate", 3, &r),
            Err(BrewinError::Name { line: 3, .. })
        ));
    }

    #[test]
    fn render_strips_quotes_and_uses_bare_lexemes() {
        assert_eq!(Value::Str("\"hi\"".to_string()).render(), "hi");
        assert_eq!(Value::Int(-3).render(), "-3");
        assert_eq!(Value::Bool(true).render(), "true");
        assert_eq!(Value::Null.render(), "null");
    }

    #[test]
    fn string_concatenation_keeps_one_pair_of_quotes() {
        let a = Value::Str("\"foo\"".to_string());
        let b = Value::Str("\"bar\"".to_string());
        match a.add(&b, 1).unwrap() {
            Value::Str(s) => assert_eq!(s, "\"foobar\""),
            _ => panic!("expected Str"),
        }
    }

    #[test]
    fn floor_division_rounds_toward_negative_infinity() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
        assert_eq!(floor_div(-7, -2), 3);
    }

    #[test]
    fn type_mismatch_on_add_is_type_error() {
        let a = Value::Int(1);
        let b = Value::Str("\"x\"".to_string());
        assert!(matches!(a.add(&b, 5), Err(BrewinError::Type { line: 5, .. })));
    }

    #[test]
    fn ordered_comparison_rejects_bool() {
        let a = Value::Bool(true);
        let b = Value::Bool(false);
        assert!(matches!(a.lt(&b, 2), Err(BrewinError::Type { .. })));
    }

    #[test]
    fn null_equals_null_and_not_an_object() {
        assert!(Value::Null.eq_value(&Value::Null, 1).unwrap());
    }

    #[test]
    fn string_ordering_compares_unwrapped_content_not_quoted_form() {
        // The naive "compare the quoted String directly" approach flips this
        // one: the quote character (0x22) sorts below the trailing space in
        // `"ab "`, so comparing raw stored forms would say `"ab "` < `"ab"`.
        let ab = Value::Str("\"ab\"".to_string());
        let ab_space = Value::Str("\"ab \"".to_string());
        assert!(matches!(ab.lt(&ab_space, 1).unwrap(), Value::Bool(true)));
        assert!(matches!(ab_space.lt(&ab, 1).unwrap(), Value::Bool(false)));
        assert!(matches!(ab.le(&ab, 1).unwrap(), Value::Bool(true)));
        assert!(matches!(ab_space.gt(&ab, 1).unwrap(), Value::Bool(true)));
        assert!(matches!(ab.ge(&ab, 1).unwrap(), Value::Bool(true)));
    }
}
