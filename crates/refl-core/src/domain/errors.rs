use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ReflResult<T> = Result<T, ReflError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReflErrorCategory {
    Validation,
    Immutability,
    StructuralMismatch,
    Lookup,
    Internal,
}

impl ReflErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Immutability => "ImmutabilityError",
            Self::StructuralMismatch => "StructuralMismatchError",
            Self::Lookup => "LookupError",
            Self::Internal => "InternalError",
        }
    }

    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Validation => 2,
            Self::Immutability => 3,
            Self::StructuralMismatch => 4,
            Self::Lookup => 5,
            Self::Internal => 6,
        }
    }
}

impl Display for ReflErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflError {
    category: ReflErrorCategory,
    code: &'static str,
    message: String,
}

impl ReflError {
    pub fn new(category: ReflErrorCategory, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ReflErrorCategory::Validation, code, message)
    }

    pub fn immutability(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ReflErrorCategory::Immutability, code, message)
    }

    pub fn structural_mismatch(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ReflErrorCategory::StructuralMismatch, code, message)
    }

    pub fn lookup(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ReflErrorCategory::Lookup, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ReflErrorCategory::Internal, code, message)
    }

    pub fn index_out_of_range(index: usize, len: usize, container: &str) -> Self {
        Self::lookup(
            "LOOKUP.INDEX_OUT_OF_RANGE",
            format!(
                "index {} is out of range for {} of length {}",
                index, container, len
            ),
        )
    }

    pub const fn category(&self) -> ReflErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code, self.message)
    }
}

impl Display for ReflError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.category, self.code, self.message)
    }
}

impl Error for ReflError {}

impl From<serde_json::Error> for ReflError {
    fn from(source: serde_json::Error) -> Self {
        Self::structural_mismatch(
            "STRUCTURE.DICT_SHAPE",
            format!("dictionary does not match the expected shape: {}", source),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ReflError, ReflErrorCategory};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (ReflErrorCategory::Validation, 2, "ValidationError"),
            (ReflErrorCategory::Immutability, 3, "ImmutabilityError"),
            (
                ReflErrorCategory::StructuralMismatch,
                4,
                "StructuralMismatchError",
            ),
            (ReflErrorCategory::Lookup, 5, "LookupError"),
            (ReflErrorCategory::Internal, 6, "InternalError"),
        ];

        for (category, exit_code, label) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.as_str(), label);
        }
    }

    #[test]
    fn diagnostic_line_carries_code_and_message() {
        let error = ReflError::index_out_of_range(3, 3, "LayerCollection");

        assert_eq!(error.category(), ReflErrorCategory::Lookup);
        assert_eq!(error.exit_code(), 5);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [LOOKUP.INDEX_OUT_OF_RANGE] index 3 is out of range for LayerCollection of length 3"
        );
    }

    #[test]
    fn serde_failures_map_to_structural_mismatch() {
        let source = serde_json::from_str::<f64>("\"not a number\"").expect_err("should fail");
        let error = ReflError::from(source);
        assert_eq!(error.category(), ReflErrorCategory::StructuralMismatch);
        assert_eq!(error.code(), "STRUCTURE.DICT_SHAPE");
    }
}
