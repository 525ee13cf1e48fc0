//! Validation utilities for registration inputs.
//!
//! This module checks user supplied configuration before any block is
//! scheduled, so that mistakes surface as errors instead of as failed blocks.

use crate::error::{RegistrationError, Result};

/// Only 2-D and 3-D images are registered.
pub fn validate_dimension(dimension: usize) -> Result<()> {
    if !(2..=3).contains(&dimension) {
        return Err(RegistrationError::dimension_mismatch(format!(
            "Registration is not supported for {}-D images",
            dimension
        )));
    }
    Ok(())
}

/// Validate a block chunk size.
pub fn validate_chunk_size(chunk_size: &[usize], dimension: usize) -> Result<()> {
    if chunk_size.len() != dimension {
        return Err(RegistrationError::invalid_configuration(format!(
            "Chunk size {:?} does not match image dimension {}",
            chunk_size, dimension
        )));
    }
    if chunk_size.iter().any(|c| *c == 0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Chunk size must be positive, got {:?}",
            chunk_size
        )));
    }
    Ok(())
}

/// Validate block overlap factors.
pub fn validate_overlap_factors(overlap_factors: &[f64], dimension: usize) -> Result<()> {
    if overlap_factors.len() != dimension {
        return Err(RegistrationError::invalid_configuration(format!(
            "Overlap factors {:?} do not match image dimension {}",
            overlap_factors, dimension
        )));
    }
    if overlap_factors.iter().any(|f| !f.is_finite() || *f < 0.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Overlap factors must be finite and non-negative, got {:?}",
            overlap_factors
        )));
    }
    Ok(())
}

/// Validate displacement grid scale factors.
pub fn validate_scale_factors(scale_factors: &[f64], dimension: usize) -> Result<()> {
    if scale_factors.len() != dimension {
        return Err(RegistrationError::invalid_configuration(format!(
            "Scale factors {:?} do not match image dimension {}",
            scale_factors, dimension
        )));
    }
    if scale_factors.iter().any(|f| !f.is_finite() || *f <= 0.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Scale factors must be finite and positive, got {:?}",
            scale_factors
        )));
    }
    Ok(())
}

/// Validate a correlation threshold.
pub fn validate_correlation_threshold(threshold: f64) -> Result<()> {
    if !(-1.0..=1.0).contains(&threshold) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Correlation threshold must lie in [-1, 1], got {}",
            threshold
        )));
    }
    Ok(())
}
