//! Float assertions over slices.

use assert_float_eq::*;

fn assert_same_length(expected: &[f64], actual: &[f64]) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
}

pub fn assert_slice_f64_near(expected: &[f64], actual: &[f64], distance: u32) {
    assert_same_length(expected, actual);
    for (&expected, &actual) in expected.iter().zip(actual) {
        if actual != expected {
            assert_f64_near!(expected, actual, distance);
        }
    }
}

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_same_length(expected, actual);
    for (&expected, &actual) in expected.iter().zip(actual) {
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near() {
        assert_slice_f64_near(&[1.0, 0.1 + 0.2], &[1.0, 0.3], 1);
    }

    #[test]
    #[should_panic = "lengths do not match"]
    fn length_mismatch() {
        assert_slice_f64_relative(&[1.0], &[1.0, 2.0], 1e-9);
    }
}
