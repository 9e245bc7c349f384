//! Interpolation utilities used across phytomer indexes and thermal time
use crate::Error;

/// Natural cubic spline through a set of knots
///
/// Evaluation is clamped to the knot range: outside of `[x_0, x_n]`, the edge
/// value is returned instead of extrapolating the cubic.
///
/// ```
/// # use adel::plantgen::Spline;
/// let s = Spline::new(&[1.0, 2.0, 3.0], &[10.0, 20.0, 10.0])?;
/// assert_eq!(s.eval(2.0), 20.0);
/// assert_eq!(s.eval(0.0), 10.0); // clamped
/// # Ok::<(), adel::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Spline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivative at each knot
    m: Vec<f64>,
}

impl Spline {
    /// Builds a spline from strictly increasing `xs`
    ///
    /// With a single knot, the spline is constant; with two, it is linear.
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self, Error> {
        if xs.is_empty() {
            return Err(Error::MissingParameter("spline knots"));
        }
        if xs.len() != ys.len() {
            return Err(Error::BadParameter("spline knots", ys.len() as f64));
        }
        if xs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(Error::NonMonotonicControlPoints("spline knots"));
        }
        let n = xs.len();
        let mut m = vec![0.0; n];
        if n > 2 {
            // Thomas algorithm on the interior knots, with natural boundary
            // conditions (m[0] = m[n - 1] = 0)
            let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
            let mut diag = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            for i in 1..n - 1 {
                diag[i] = 2.0 * (h[i - 1] + h[i]);
                rhs[i] = 6.0
                    * ((ys[i + 1] - ys[i]) / h[i]
                        - (ys[i] - ys[i - 1]) / h[i - 1]);
            }
            for i in 2..n - 1 {
                let w = h[i - 1] / diag[i - 1];
                diag[i] -= w * h[i - 1];
                rhs[i] -= w * rhs[i - 1];
            }
            for i in (1..n - 1).rev() {
                m[i] = (rhs[i] - h[i] * m[i + 1]) / diag[i];
            }
        }
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            m,
        })
    }

    /// Evaluates the spline at `x`
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 || x <= self.xs[0] {
            return self.ys[0];
        } else if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        // Index of the interval's right knot
        let j = self.xs.partition_point(|v| *v <= x).clamp(1, n - 1);
        let i = j - 1;
        let h = self.xs[j] - self.xs[i];
        let a = (self.xs[j] - x) / h;
        let b = (x - self.xs[i]) / h;
        a * self.ys[i]
            + b * self.ys[j]
            + ((a.powi(3) - a) * self.m[i] + (b.powi(3) - b) * self.m[j])
                * h
                * h
                / 6.0
    }

    /// Returns the knot range `(x_0, x_n)`
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

/// Piecewise-linear interpolation through strictly increasing `xs`
///
/// Values outside of the knot range are clamped to the edge values.  Callers
/// are responsible for the ordering invariant, which is checked in debug
/// builds only.
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    debug_assert!(xs.windows(2).all(|w| w[1] > w[0]));
    let n = xs.len();
    if x <= xs[0] {
        return ys[0];
    } else if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let j = xs.partition_point(|v| *v <= x).clamp(1, n - 1);
    let i = j - 1;
    let t = (x - xs[i]) / (xs[j] - xs[i]);
    ys[i] + t * (ys[j] - ys[i])
}

/// Returns `n` evenly spaced values over `[start, end]`
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn spline_reproduces_knots() {
        let xs = [1.0, 2.0, 3.5, 4.0, 7.0];
        let ys = [3.0, -1.0, 2.0, 2.5, 0.0];
        let s = Spline::new(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_relative_eq!(s.eval(*x), *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn spline_of_line_is_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 5.0, 7.0];
        let s = Spline::new(&xs, &ys).unwrap();
        for x in linspace(0.0, 3.0, 31) {
            assert_relative_eq!(s.eval(x), 1.0 + 2.0 * x, epsilon = 1e-12);
        }
    }

    #[test]
    fn spline_degenerate() {
        let s = Spline::new(&[2.0], &[5.0]).unwrap();
        assert_eq!(s.eval(-10.0), 5.0);
        assert_eq!(s.eval(10.0), 5.0);

        let s = Spline::new(&[0.0, 2.0], &[0.0, 4.0]).unwrap();
        assert_relative_eq!(s.eval(0.5), 1.0);

        assert!(matches!(
            Spline::new(&[0.0, 0.0], &[1.0, 2.0]),
            Err(Error::NonMonotonicControlPoints(_))
        ));
        assert!(Spline::new(&[], &[]).is_err());
    }

    #[test]
    fn interp_clamps() {
        let xs = [0.0, 10.0, 20.0];
        let ys = [5.0, 3.0, 0.0];
        assert_eq!(interp(-1.0, &xs, &ys), 5.0);
        assert_eq!(interp(5.0, &xs, &ys), 4.0);
        assert_eq!(interp(15.0, &xs, &ys), 1.5);
        assert_eq!(interp(25.0, &xs, &ys), 0.0);
    }

    #[test]
    fn linspace_endpoints() {
        let v = linspace(0.0, 1.0, 1000);
        assert_eq!(v.len(), 1000);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[999], 1.0);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
