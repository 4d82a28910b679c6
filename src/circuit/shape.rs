//! Shape resolution for node references.
//!
//! Every template calls [`resolve_shape`] before creating its branch
//! variables, so a resistor between a 3-phase array node and ground gets a
//! 3-wide branch rather than a shape error.
//!
//! Rules, in priority order:
//! 1. any complex reference makes the result complex, with the largest array
//!    length among the references (1 if there are none); single phasors
//!    broadcast, other lengths must agree. The length is not a bare
//!    maximum: `Complex(2)` with `Array(3)` is a [`ShapeConflict`], not
//!    `Complex(3)`
//! 2. otherwise any array reference makes the result an array, and all array
//!    references must have the same length
//! 3. otherwise the result is a real scalar
//!
//! Literals never constrain the shape.

use super::types::{NodeRef, Shape};
use crate::error::ShapeConflict;

/// Determine the common shape of a set of node references.
pub fn resolve_shape(refs: &[NodeRef]) -> Result<Shape, ShapeConflict> {
    combine_shapes(refs.iter().filter_map(NodeRef::shape))
}

/// Determine the common shape of a set of shapes.
pub fn combine_shapes<I>(shapes: I) -> Result<Shape, ShapeConflict>
where
    I: IntoIterator<Item = Shape>,
{
    let shapes: Vec<Shape> = shapes.into_iter().collect();

    if shapes.iter().any(Shape::is_complex) {
        let len = shapes
            .iter()
            .filter(|s| !s.is_scalar())
            .map(Shape::len)
            .max()
            .unwrap_or(1);
        let widest = shapes
            .iter()
            .copied()
            .find(|s| !s.is_scalar() && s.len() == len)
            .unwrap_or(Shape::Complex(len));
        if let Some(bad) = shapes
            .iter()
            .copied()
            .find(|s| !s.is_scalar() && s.len() != 1 && s.len() != len)
        {
            return Err(ShapeConflict {
                expected: widest,
                found: bad,
            });
        }
        return Ok(Shape::Complex(len));
    }

    let mut array: Option<Shape> = None;
    for shape in shapes {
        if let Shape::Array(n) = shape {
            match array {
                None => array = Some(shape),
                Some(first) if first.len() != n => {
                    return Err(ShapeConflict {
                        expected: first,
                        found: shape,
                    });
                }
                Some(_) => {}
            }
        }
    }

    Ok(array.unwrap_or(Shape::Scalar))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::VarId;

    #[test]
    fn test_literal_with_array() {
        let refs = [NodeRef::Literal(0.0), NodeRef::Array(VarId(0), 4)];
        assert_eq!(resolve_shape(&refs), Ok(Shape::Array(4)));
    }

    #[test]
    fn test_array_length_mismatch() {
        let refs = [NodeRef::Array(VarId(0), 3), NodeRef::Array(VarId(1), 4)];
        let err = resolve_shape(&refs).unwrap_err();
        assert_eq!(err.expected, Shape::Array(3));
        assert_eq!(err.found, Shape::Array(4));
    }

    #[test]
    fn test_scalars_and_literals() {
        let refs = [NodeRef::Scalar(VarId(0)), NodeRef::GROUND];
        assert_eq!(resolve_shape(&refs), Ok(Shape::Scalar));
        assert_eq!(resolve_shape(&[NodeRef::GROUND, NodeRef::Literal(5.0)]), Ok(Shape::Scalar));
    }

    #[test]
    fn test_complex_takes_array_length() {
        let refs = [NodeRef::Complex(VarId(0), 1), NodeRef::Array(VarId(1), 3)];
        assert_eq!(resolve_shape(&refs), Ok(Shape::Complex(3)));

        let refs = [NodeRef::Complex(VarId(0), 1), NodeRef::Scalar(VarId(1))];
        assert_eq!(resolve_shape(&refs), Ok(Shape::Complex(1)));
    }

    #[test]
    fn test_complex_rejects_disagreeing_lengths() {
        let refs = [NodeRef::Complex(VarId(0), 2), NodeRef::Array(VarId(1), 3)];
        assert_eq!(
            resolve_shape(&refs),
            Err(ShapeConflict {
                expected: Shape::Array(3),
                found: Shape::Complex(2),
            })
        );
    }
}
