//! Kernel argument binding
//!
//! The GPU kernels are generated against one fixed positional argument
//! order: matrix indices, matrix values, x vector, y vector, alpha, beta,
//! temp globals (declaration order), output, temp locals (declaration
//! order), then the size scalars. [`ArgContainer`] is that order made
//! structural; nothing downstream may reorder it.

use crate::config::expr::{self, SizeScope};
use crate::config::KernelConfig;
use crate::dtype::SemiringElement;
use crate::encode::EncodedMatrix;
use crate::error::{Error, Result};
use crate::vector::VectorStrategy;

/// Ordered argument set for one benchmark configuration.
///
/// The two vector slots are the ping-pong targets: the execution engine
/// rewrites their contents every trial and swaps their roles every
/// iteration. Everything else is immutable once built.
#[derive(Debug, Clone)]
pub struct ArgContainer<T: SemiringElement> {
    /// Encoded matrix index bytes
    pub m_idxs: Vec<u8>,
    /// Encoded matrix value bytes
    pub m_vals: Vec<u8>,
    /// Initial x-vector bytes (iteration input)
    pub x_vect: Vec<u8>,
    /// Initial y-vector bytes
    pub y_vect: Vec<u8>,
    /// First scalar coefficient
    pub alpha: T,
    /// Second scalar coefficient
    pub beta: T,
    /// Temp-global buffer byte sizes, declaration order
    pub temp_globals: Vec<u64>,
    /// Output buffer byte size
    pub output: u64,
    /// Temp-local buffer byte sizes, declaration order
    pub temp_locals: Vec<u64>,
    /// Size scalars in kernel-declared order: width, height, length
    pub size_args: [u32; 3],
}

impl<T: SemiringElement> ArgContainer<T> {
    /// Resolve a kernel config's size expressions against an encoded
    /// matrix and build the full ordered argument set.
    ///
    /// `vector_length` is the matrix's logical width (the `v_VLength_3`
    /// symbol). The x vector gets that length; the y and output slots use
    /// the encoded (padded) height the kernel actually addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Expr`] for unevaluable size expressions and
    /// [`Error::Config`] for sizes that come out negative.
    pub fn bind(
        matrix: &EncodedMatrix,
        config: &KernelConfig,
        x: &VectorStrategy<T>,
        y: &VectorStrategy<T>,
        alpha: T,
        beta: T,
        vector_length: usize,
    ) -> Result<Self> {
        let scope = SizeScope {
            m_width_c: i64::from(matrix.cl_width()),
            m_height: i64::from(matrix.cl_height()),
            v_length: vector_length as i64,
        };

        let eval_size = |descr: &crate::config::ArgDescr| -> Result<u64> {
            let v = expr::evaluate(&descr.size, &scope)?;
            u64::try_from(v).map_err(|_| {
                Error::Config(format!(
                    "size of '{}' evaluated to {v}, expected non-negative",
                    descr.variable
                ))
            })
        };

        let temp_globals = config
            .temp_globals
            .iter()
            .map(&eval_size)
            .collect::<Result<Vec<_>>>()?;
        let temp_locals = config
            .temp_locals
            .iter()
            .map(&eval_size)
            .collect::<Result<Vec<_>>>()?;
        let output = eval_size(&config.output_arg)?;

        Ok(Self {
            m_idxs: matrix.indices().to_vec(),
            m_vals: matrix.values().to_vec(),
            x_vect: x.generate_bytes(vector_length),
            y_vect: y.generate_bytes(matrix.cl_height() as usize),
            alpha,
            beta,
            temp_globals,
            output,
            temp_locals,
            size_args: [
                matrix.cl_width() as u32,
                matrix.cl_height(),
                vector_length as u32,
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode, EncodingFlags};
    use crate::matrix::CooMatrix;

    fn config() -> KernelConfig {
        KernelConfig::from_json(
            r#"{
                "name": "k", "source": "s",
                "properties": {},
                "outputArg": {"variable": "out", "addressSpace": "global", "size": "v_MHeight_2 * 4"},
                "tempGlobals": [
                    {"variable": "tg", "addressSpace": "global", "size": "v_VLength_3 * 8"}
                ],
                "tempLocals": [
                    {"variable": "tl", "addressSpace": "local", "size": "v_MWidthC_1 * 4"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn binds_in_declared_order_with_resolved_sizes() {
        let coo = CooMatrix::new(vec![(0, 0, 1.0f32), (1, 1, 2.0)], 2, 2).unwrap();
        let encoded = encode(&coo, &EncodingFlags::regular(0.0f32), u64::MAX).unwrap();
        let args = ArgContainer::bind(
            &encoded,
            &config(),
            &VectorStrategy::Constant(1.0f32),
            &VectorStrategy::Constant(0.0f32),
            1.0,
            0.0,
            2,
        )
        .unwrap();

        assert_eq!(args.size_args, [1, 2, 2]);
        assert_eq!(args.output, 8); // height 2 * 4
        assert_eq!(args.temp_globals, vec![16]); // length 2 * 8
        assert_eq!(args.temp_locals, vec![4]); // width 1 * 4
        assert_eq!(args.x_vect.len(), 8); // 2 f32 elements
        assert_eq!(args.y_vect.len(), 8);
    }

    #[test]
    fn negative_size_is_rejected() {
        let mut cfg = config();
        cfg.output_arg.size = "0 - 4".into();
        let coo = CooMatrix::new(vec![(0, 0, 1.0f32)], 1, 1).unwrap();
        let encoded = encode(&coo, &EncodingFlags::regular(0.0f32), u64::MAX).unwrap();
        let err = ArgContainer::bind(
            &encoded,
            &cfg,
            &VectorStrategy::Constant(1.0f32),
            &VectorStrategy::Constant(0.0f32),
            1.0,
            0.0,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
