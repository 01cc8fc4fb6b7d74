//! Input range handling.
//!
//! Tensors arrive in `[-1, 1]` and are mapped onto `[0, 1]` with
//! `(x + 1) * 0.5` before any metric runs. Values outside the nominal range
//! are clamped by default, which hides unnormalised inputs; callers that want
//! those surfaced can select [`RangePolicy::Reject`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tensor::ImageTensor;

/// Lower bound of the accepted input range.
pub const INPUT_MIN: f32 = -1.0;
/// Upper bound of the accepted input range.
pub const INPUT_MAX: f32 = 1.0;

/// How to treat inputs outside `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    /// Rescale, then clip into `[0, 1]`.
    #[default]
    Clamp,
    /// Fail with [`Error::InvalidRange`] on the first out-of-range element.
    Reject,
}

/// A tensor rescaled onto `[0, 1]`.
#[derive(Debug, Clone)]
pub struct UnitTensor {
    tensor: ImageTensor,
    clamped: usize,
}

impl UnitTensor {
    /// The rescaled tensor.
    #[must_use]
    pub fn tensor(&self) -> &ImageTensor {
        &self.tensor
    }

    /// Number of elements that had to be clipped.
    #[must_use]
    pub fn clamped(&self) -> usize {
        self.clamped
    }

    /// Consume the wrapper, returning the rescaled tensor.
    #[must_use]
    pub fn into_tensor(self) -> ImageTensor {
        self.tensor
    }
}

/// Map a `[-1, 1]` tensor onto `[0, 1]` according to `policy`.
///
/// # Errors
///
/// Returns [`Error::InvalidRange`] under [`RangePolicy::Reject`] when any
/// element lies outside `[-1, 1]`.
pub fn to_unit_range(input: &ImageTensor, policy: RangePolicy) -> Result<UnitTensor> {
    let out_of_range = |v: f32| !(INPUT_MIN..=INPUT_MAX).contains(&v);

    if policy == RangePolicy::Reject {
        if let Some((index, &value)) = input
            .as_slice()
            .iter()
            .enumerate()
            .find(|&(_, &v)| out_of_range(v))
        {
            return Err(Error::InvalidRange {
                index,
                value,
                min: INPUT_MIN,
                max: INPUT_MAX,
            });
        }
    }

    let clamped = input.as_slice().iter().filter(|&&v| out_of_range(v)).count();
    if clamped > 0 {
        log::debug!(
            "clamping {clamped} of {} elements outside [{INPUT_MIN}, {INPUT_MAX}]",
            input.shape().len()
        );
    }

    Ok(UnitTensor {
        tensor: input.map(|v| ((v + 1.0) * 0.5).clamp(0.0, 1.0)),
        clamped,
    })
}
