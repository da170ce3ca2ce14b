//! Gaussian elimination over a prime field.
//!
//! Rows are linear congruences `a_0 x_0 + ... + a_{m-1} x_{m-1} ≡ b (mod n)`.
//! Elimination brings the augmented matrix to reduced row echelon form, using
//! modular inverses of the pivots to normalize each pivot row.

use super::ScalarField;
use num_bigint::BigUint;
use num_traits::Zero;

/// A system of linear congruences over a [`ScalarField`].
#[derive(Debug, Clone)]
pub struct LinearSystem<'a> {
    field: &'a ScalarField,
    columns: usize,
    /// Augmented rows: `columns` coefficients followed by the right-hand side.
    rows: Vec<Vec<BigUint>>,
}

/// A pivot variable written in terms of the free variables:
/// `x_column = constant + Σ coeff * x_free`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotRow {
    pub column: usize,
    pub constant: BigUint,
    pub terms: Vec<(usize, BigUint)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solution {
    /// One value per column.
    Unique(Vec<BigUint>),
    /// Free variables remain after elimination.
    Parametric {
        pivots: Vec<PivotRow>,
        free: Vec<usize>,
    },
    /// Some equation reduced to `0 ≡ c` with `c ≠ 0`.
    Inconsistent { equation: usize },
    /// The system has no rows.
    Empty,
}

impl<'a> LinearSystem<'a> {
    pub fn new(field: &'a ScalarField, columns: usize) -> Self {
        Self {
            field,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends `Σ coeffs[j] * x_j ≡ rhs`. Missing trailing coefficients are zero.
    pub fn push_row(&mut self, coeffs: &[BigUint], rhs: &BigUint) {
        let mut row = vec![BigUint::zero(); self.columns + 1];
        for (slot, coeff) in row.iter_mut().zip(coeffs.iter().take(self.columns)) {
            *slot = self.field.reduce(coeff);
        }
        row[self.columns] = self.field.reduce(rhs);
        self.rows.push(row);
    }

    /// Row reduces the system and classifies its solution set.
    pub fn solve(&self) -> Solution {
        if self.rows.is_empty() {
            return Solution::Empty;
        }

        let field = self.field;
        let width = self.columns + 1;
        let mut rows = self.rows.clone();
        let mut origin: Vec<usize> = (0..rows.len()).collect();
        let mut pivot_cols = Vec::new();
        let mut next = 0;

        for col in 0..self.columns {
            if next == rows.len() {
                break;
            }
            let Some(found) = (next..rows.len()).find(|&r| !rows[r][col].is_zero()) else {
                continue;
            };
            rows.swap(next, found);
            origin.swap(next, found);

            // Nonzero entries of a prime field are always invertible.
            let Some(inv) = field.inverse(&rows[next][col]) else {
                continue;
            };
            for entry in rows[next][col..width].iter_mut() {
                *entry = field.mul(entry, &inv);
            }

            let pivot = rows[next].clone();
            for (r, row) in rows.iter_mut().enumerate() {
                if r == next || row[col].is_zero() {
                    continue;
                }
                let factor = row[col].clone();
                for j in col..width {
                    row[j] = field.sub(&row[j], &field.mul(&factor, &pivot[j]));
                }
            }

            pivot_cols.push(col);
            next += 1;
        }

        if let Some(r) = (next..rows.len()).find(|&r| !rows[r][self.columns].is_zero()) {
            return Solution::Inconsistent { equation: origin[r] };
        }

        if pivot_cols.len() == self.columns {
            return Solution::Unique(
                rows.into_iter()
                    .take(self.columns)
                    .map(|mut row| row.swap_remove(self.columns))
                    .collect(),
            );
        }

        let free: Vec<usize> = (0..self.columns)
            .filter(|c| !pivot_cols.contains(c))
            .collect();
        let pivots = pivot_cols
            .iter()
            .zip(rows.iter())
            .map(|(&column, row)| PivotRow {
                column,
                constant: row[self.columns].clone(),
                terms: free
                    .iter()
                    .filter(|&&f| !row[f].is_zero())
                    .map(|&f| (f, field.neg(&row[f])))
                    .collect(),
            })
            .collect();

        Solution::Parametric { pivots, free }
    }
}
