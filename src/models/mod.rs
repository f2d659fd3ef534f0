pub mod checkbox;
pub mod enums;
pub mod field;
pub mod geometry;
pub mod line;

pub use checkbox::{Checkbox, CheckboxGroup};
pub use enums::{FieldType, MatchMethod, ParseEnumError};
pub use field::Field;
pub use geometry::{NormalizedRect, MIN_RECT_SIZE};
pub use line::RecognizedLine;
