//! Block-pair registration methods.

pub mod translation;

pub use translation::{TranslationSearchConfig, TranslationSearchMethod};
