//! Elementwise arithmetic over named vectors.
//!
//! The integrator only needs two operations on a state: a keywise sum and a
//! multiplication by a scalar. [NamedVector] captures exactly that, so the same
//! [crate::solver::Rk4] can advance the fixed-field [crate::PatientState] as well
//! as a sparse `HashMap<String, f64>`.
//!
//! Both operations return a new value; operands are never mutated.

use std::collections::HashMap;

/// A vector whose components are addressed by name.
///
/// `Default` must be the additive identity (all zeros, or no keys at all).
pub trait NamedVector: Clone + Default {
    /// Keywise sum of `self` and `other`, over the union of their keys.
    /// A key absent from one operand counts as zero.
    fn sum_with(&self, other: &Self) -> Self;

    /// Multiply every present component by `a`.
    fn scaled(&self, a: f64) -> Self;
}

/// Keywise total over any number of vectors.
///
/// An empty input yields `V::default()`.
pub fn sum<'a, V, I>(vectors: I) -> V
where
    V: NamedVector + 'a,
    I: IntoIterator<Item = &'a V>,
{
    vectors
        .into_iter()
        .fold(V::default(), |acc, vector| acc.sum_with(vector))
}

/// Multiply every entry of `vector` by `a`.
pub fn scale<V: NamedVector>(vector: &V, a: f64) -> V {
    vector.scaled(a)
}

impl NamedVector for HashMap<String, f64> {
    fn sum_with(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (key, value) in other {
            *out.entry(key.clone()).or_insert(0.0) += value;
        }
        out
    }

    fn scaled(&self, a: f64) -> Self {
        self.iter().map(|(key, value)| (key.clone(), value * a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn named(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn disjoint_keys_concatenate() {
        let a = named(&[("Q1", 1.0), ("Q2", 2.0)]);
        let b = named(&[("I", 3.0)]);

        let total = sum([&a, &b]);

        assert_eq!(total, named(&[("Q1", 1.0), ("Q2", 2.0), ("I", 3.0)]));
    }

    #[test]
    fn missing_keys_count_as_zero() {
        let a = named(&[("Q1", 1.0), ("Q2", 2.0)]);
        let b = named(&[("Q2", 0.5), ("D1", -4.0)]);
        let c = named(&[("Q1", 10.0)]);

        let total = sum([&a, &b, &c]);

        assert_relative_eq!(total["Q1"], 11.0);
        assert_relative_eq!(total["Q2"], 2.5);
        assert_relative_eq!(total["D1"], -4.0);
        assert_eq!(total.len(), 3);
    }

    #[test]
    fn vector_minus_itself_is_zero_on_its_keys() {
        let v = named(&[("x1", 0.25), ("x2", -1.5), ("x3", 7.0)]);

        let zero = sum([&v, &scale(&v, -1.0)]);

        assert_eq!(zero.len(), 3);
        for value in zero.values() {
            assert_eq!(*value, 0.0);
        }
    }

    #[test]
    fn scale_leaves_input_untouched() {
        let v = named(&[("S1", 2.0), ("S2", 4.0)]);

        let doubled = scale(&v, 2.0);

        assert_relative_eq!(doubled["S1"], 4.0);
        assert_relative_eq!(doubled["S2"], 8.0);
        assert_relative_eq!(v["S1"], 2.0);
    }

    #[test]
    fn empty_sum_is_default() {
        let total: HashMap<String, f64> = sum(std::iter::empty());
        assert!(total.is_empty());
    }
}
