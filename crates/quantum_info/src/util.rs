// This code is part of csvqe.
//
// (C) Copyright the csvqe developers 2026
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

use num_complex::{Complex, Complex64};

/// Create a new [`Complex<f64>`] with arguments that can convert [`Into<f64>`].  The two
/// generic parameters allow calls like `c64(norm, 0)` that mix floats and integers.
#[inline]
pub fn c64<T: Into<f64>, V: Into<f64>>(re: T, im: V) -> Complex64 {
    Complex::new(re.into(), im.into())
}

pub const C_ZERO: Complex64 = Complex64::new(0., 0.);
pub const C_ONE: Complex64 = Complex64::new(1., 0.);
pub const C_M_ONE: Complex64 = Complex64::new(-1., 0.);
pub const IM: Complex64 = Complex64::new(0., 1.);
pub const M_IM: Complex64 = Complex64::new(0., -1.);

/// Multiply `value` by `i ** power`.  Only the power modulo 4 matters.
#[inline]
pub fn mul_i_pow(value: Complex64, power: u32) -> Complex64 {
    match power % 4 {
        0 => value,
        1 => c64(-value.im, value.re),
        2 => -value,
        3 => c64(value.im, -value.re),
        _ => unreachable!("'x % 4' has only four possible values"),
    }
}
