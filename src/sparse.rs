use anyhow::{format_err, Result};
use nalgebra::{ClosedAddAssign, Scalar};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use num_complex::Complex64;
use num_traits::Zero;

/// Element-wise operations on complex sparse matrices.
pub trait CCsr {
    fn conj(&self) -> CsrMatrix<Complex64>;
    fn real(&self) -> CsrMatrix<f64>;
    fn imag(&self) -> CsrMatrix<f64>;
}

impl CCsr for CsrMatrix<Complex64> {
    fn conj(&self) -> CsrMatrix<Complex64> {
        let mut a = self.clone();
        a.values_mut().iter_mut().for_each(|v| *v = v.conj());
        a
    }

    fn real(&self) -> CsrMatrix<f64> {
        map_values(self, |v| v.re)
    }

    fn imag(&self) -> CsrMatrix<f64> {
        map_values(self, |v| v.im)
    }
}

fn map_values<T, U, F>(a: &CsrMatrix<T>, f: F) -> CsrMatrix<U>
where
    T: Scalar,
    U: Scalar + Zero + ClosedAddAssign,
    F: Fn(&T) -> U,
{
    let mut coo = CooMatrix::new(a.nrows(), a.ncols());
    for (i, j, v) in a.triplet_iter() {
        coo.push(i, j, f(v));
    }
    CsrMatrix::from(&coo)
}

/// Square sparse matrix with `diag` on the diagonal.
pub fn with_diagonal<T>(diag: &[T]) -> CsrMatrix<T>
where
    T: Scalar + Zero + ClosedAddAssign,
{
    let n = diag.len();
    let mut coo = CooMatrix::new(n, n);
    for (i, d) in diag.iter().enumerate() {
        coo.push(i, i, d.clone());
    }
    CsrMatrix::from(&coo)
}

/// Sparse matrix with one row per entry of `col_idx`, holding `values[k]`
/// at `(k, col_idx[k])`.
pub fn with_row_entries<T>(cols: usize, col_idx: &[usize], values: &[T]) -> CsrMatrix<T>
where
    T: Scalar + Zero + ClosedAddAssign,
{
    let mut coo = CooMatrix::new(col_idx.len(), cols);
    for (k, (&j, v)) in col_idx.iter().zip(values).enumerate() {
        coo.push(k, j, v.clone());
    }
    CsrMatrix::from(&coo)
}

/// Selects the given rows and columns (in the given order). `None` keeps
/// all rows/columns. Column indexes must be unique.
pub fn select<T>(
    a: &CsrMatrix<T>,
    rows: Option<&[usize]>,
    cols: Option<&[usize]>,
) -> Result<CsrMatrix<T>>
where
    T: Scalar + Zero + ClosedAddAssign,
{
    let all_rows: Vec<usize>;
    let rows = match rows {
        Some(rows) => rows,
        None => {
            all_rows = (0..a.nrows()).collect();
            &all_rows
        }
    };
    if let Some(&r) = rows.iter().find(|&&r| r >= a.nrows()) {
        return Err(format_err!(
            "row index {} out of bounds for matrix with {} rows",
            r,
            a.nrows()
        ));
    }

    // position of each source column in the result
    let (ncols, col_pos) = match cols {
        Some(cols) => {
            let mut col_pos = vec![None; a.ncols()];
            for (k, &c) in cols.iter().enumerate() {
                if c >= a.ncols() {
                    return Err(format_err!(
                        "column index {} out of bounds for matrix with {} columns",
                        c,
                        a.ncols()
                    ));
                }
                col_pos[c] = Some(k);
            }
            (cols.len(), col_pos)
        }
        None => (a.ncols(), (0..a.ncols()).map(Some).collect()),
    };

    let mut coo = CooMatrix::new(rows.len(), ncols);
    for (i, &r) in rows.iter().enumerate() {
        let row = a.row(r);
        for (&c, v) in row.col_indices().iter().zip(row.values()) {
            if let Some(j) = col_pos[c] {
                coo.push(i, j, v.clone());
            }
        }
    }
    Ok(CsrMatrix::from(&coo))
}

/// Stacks matrices vertically. All blocks must have the same number of columns.
pub fn v_stack<T>(blocks: &[&CsrMatrix<T>]) -> Result<CsrMatrix<T>>
where
    T: Scalar + Zero + ClosedAddAssign,
{
    let ncols = blocks.first().map_or(0, |b| b.ncols());
    let nrows = blocks.iter().map(|b| b.nrows()).sum();

    let mut coo = CooMatrix::new(nrows, ncols);
    let mut offset = 0;
    for b in blocks {
        if b.ncols() != ncols {
            return Err(format_err!(
                "v_stack: block has {} columns, expected {}",
                b.ncols(),
                ncols
            ));
        }
        for (i, j, v) in b.triplet_iter() {
            coo.push(offset + i, j, v.clone());
        }
        offset += b.nrows();
    }
    Ok(CsrMatrix::from(&coo))
}

/// Stacks matrices horizontally. All blocks must have the same number of rows.
pub fn h_stack<T>(blocks: &[&CsrMatrix<T>]) -> Result<CsrMatrix<T>>
where
    T: Scalar + Zero + ClosedAddAssign,
{
    let nrows = blocks.first().map_or(0, |b| b.nrows());
    let ncols = blocks.iter().map(|b| b.ncols()).sum();

    let mut coo = CooMatrix::new(nrows, ncols);
    let mut offset = 0;
    for b in blocks {
        if b.nrows() != nrows {
            return Err(format_err!(
                "h_stack: block has {} rows, expected {}",
                b.nrows(),
                nrows
            ));
        }
        for (i, j, v) in b.triplet_iter() {
            coo.push(i, offset + j, v.clone());
        }
        offset += b.ncols();
    }
    Ok(CsrMatrix::from(&coo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn sample() -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(3, 3);
        coo.push(0, 0, 1.0);
        coo.push(0, 2, 2.0);
        coo.push(1, 1, 3.0);
        coo.push(2, 0, 4.0);
        coo.push(2, 2, 5.0);
        CsrMatrix::from(&coo)
    }

    #[test]
    fn test_select() -> Result<()> {
        let a = sample();
        let s = select(&a, Some(&[2, 0][..]), Some(&[2, 1][..]))?;
        let expected = DMatrix::from_row_slice(2, 2, &[5.0, 0.0, 2.0, 0.0]);
        if DMatrix::from(&s) != expected {
            return Err(format_err!("unexpected selection:\n{}", DMatrix::from(&s)));
        }
        Ok(())
    }

    #[test]
    fn test_select_out_of_bounds() {
        let a = sample();
        assert!(select(&a, Some(&[3][..]), None).is_err());
        assert!(select(&a, None, Some(&[0, 7][..])).is_err());
    }

    #[test]
    fn test_stack() -> Result<()> {
        let a = sample();
        let v = v_stack(&[&a, &a])?;
        let h = h_stack(&[&a, &a])?;
        if (v.nrows(), v.ncols()) != (6, 3) || (h.nrows(), h.ncols()) != (3, 6) {
            return Err(format_err!("unexpected stacked shapes"));
        }
        let vd = DMatrix::from(&v);
        let hd = DMatrix::from(&h);
        if vd[(5, 2)] != 5.0 || hd[(2, 5)] != 5.0 || hd[(0, 3)] != 1.0 {
            return Err(format_err!("stacked values misplaced"));
        }
        assert!(v_stack(&[&a, &CsrMatrix::<f64>::zeros(1, 2)]).is_err());
        Ok(())
    }

    #[test]
    fn test_complex_parts() {
        let d = with_diagonal(&[Complex64::new(1.0, -2.0), Complex64::new(0.5, 3.0)]);
        assert_eq!(DMatrix::from(&d.real())[(1, 1)], 0.5);
        assert_eq!(DMatrix::from(&d.imag())[(0, 0)], -2.0);
        assert_eq!(DMatrix::from(&d.conj())[(1, 1)], Complex64::new(0.5, -3.0));
    }

    #[test]
    fn test_with_row_entries() {
        let m = with_row_entries(4, &[3, 1], &[7.0, 8.0]);
        let d = DMatrix::from(&m);
        assert_eq!((d.nrows(), d.ncols()), (2, 4));
        assert_eq!(d[(0, 3)], 7.0);
        assert_eq!(d[(1, 1)], 8.0);
    }
}
