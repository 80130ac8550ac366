//! Field validation helpers shared by every info request.
//!
//! A [`Validator`] collects violations for one struct and turns them into a
//! single [`ValidationErrors`] value, so callers see every bad field at once
//! instead of only the first.

use std::fmt;

/// Enums with a fixed, known set of textual values.
pub trait KnownValues: Sized + 'static {
    /// Every accepted value, in wire form.
    fn known_values() -> &'static [&'static str];

    /// Wire form of this value.
    fn as_str(&self) -> &'static str;

    /// Look up a value by its wire form.
    fn from_known(value: &str) -> Option<Self>;
}

/// What went wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// A required field was empty
    Required,
    /// A value outside the field's known-value set
    InvalidEnum { value: String, known: Vec<String> },
    /// Any other constraint violation
    Invalid(String),
}

/// One violation on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub type_name: String,
    pub field: String,
    pub kind: FieldErrorKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FieldErrorKind::Required => {
                write!(f, "{}.{} is required", self.type_name, self.field)
            }
            FieldErrorKind::InvalidEnum { value, known } => write!(
                f,
                "{}.{}: invalid value {:?}, expected one of [{}]",
                self.type_name,
                self.field,
                value,
                known.join(", ")
            ),
            FieldErrorKind::Invalid(reason) => {
                write!(f, "{}.{}: {}", self.type_name, self.field, reason)
            }
        }
    }
}

/// Aggregate of field violations. Never constructed empty by [`Validator`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether any violation concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Collects violations for one struct.
#[derive(Debug)]
pub struct Validator {
    type_name: &'static str,
    errors: ValidationErrors,
}

impl Validator {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            errors: ValidationErrors::new(),
        }
    }

    fn push(&mut self, field: &str, kind: FieldErrorKind) {
        self.errors.push(FieldError {
            type_name: self.type_name.to_string(),
            field: field.to_string(),
            kind,
        });
    }

    /// A required string must be non-empty (whitespace counts as empty).
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, FieldErrorKind::Required);
        }
        self
    }

    /// An optional string, when set, must be non-empty.
    pub fn non_empty_if_set(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            if value.trim().is_empty() {
                self.push(
                    field,
                    FieldErrorKind::Invalid("must not be empty when set".to_string()),
                );
            }
        }
        self
    }

    /// `Ok(())` when nothing was recorded.
    pub fn finish(&mut self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

fn invalid_enum_kind<T: KnownValues>(value: &str) -> FieldErrorKind {
    FieldErrorKind::InvalidEnum {
        value: value.to_string(),
        known: T::known_values().iter().map(|s| s.to_string()).collect(),
    }
}

/// Parse enum text, producing a field violation for unknown values.
pub fn parse_enum<T: KnownValues>(
    type_name: &'static str,
    field: &str,
    value: &str,
) -> Result<T, ValidationErrors> {
    T::from_known(value).ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.push(FieldError {
            type_name: type_name.to_string(),
            field: field.to_string(),
            kind: invalid_enum_kind::<T>(value),
        });
        errors
    })
}

/// Implements `KnownValues`, `FromStr`, `Display` and string serde for a
/// fieldless enum.
macro_rules! known_values_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $crate::validation::KnownValues for $name {
            fn known_values() -> &'static [&'static str] {
                &[$($text),+]
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            fn from_known(value: &str) -> Option<Self> {
                match value {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::validation::KnownValues::as_str(self))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::validation::ValidationErrors;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                $crate::validation::parse_enum(stringify!($name), "value", s)
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(
                &self,
                serializer: S,
            ) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::validation::KnownValues::as_str(self))
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> ::std::result::Result<Self, D::Error> {
                let text = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                <Self as ::std::str::FromStr>::from_str(&text)
                    .map_err(<D::Error as ::serde::de::Error>::custom)
            }
        }
    };
}
