use crate::options::Options;
use crate::scalar::{RealScalar, Scalar};

/// A bundle of everything an integration run needs besides the right-hand
/// side closure itself: initial state, time span, order, tolerance,
/// parameters, and run options. Kept separate from the closure so the same
/// problem can be handed to `integrate` and `integrate_grid` without
/// duplicating the scalar fields.
#[derive(Debug, Clone)]
pub struct Problem<T: Scalar, R: RealScalar> {
    pub x0: Vec<T>,
    pub t0: R,
    pub t_max: R,
    pub order: usize,
    pub abstol: R,
    pub params: Vec<T>,
    pub options: Options,
}

impl<T: Scalar, R: RealScalar> Problem<T, R> {
    pub fn new(x0: Vec<T>, t0: R, t_max: R, order: usize, abstol: R) -> Self {
        Self {
            x0,
            t0,
            t_max,
            order,
            abstol,
            params: Vec::new(),
            options: Options::default(),
        }
    }

    pub fn with_params(mut self, params: Vec<T>) -> Self {
        self.params = params;
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn direction(&self) -> R {
        if self.t_max >= self.t0 {
            R::one()
        } else {
            -R::one()
        }
    }
}
