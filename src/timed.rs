//! Wall-clock timing of fallible computations.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Timed<V> {
    pub value: V,
    pub elapsed: Duration,
}
impl<V> Timed<V> {
    pub fn result<E>(f: impl FnOnce() -> Result<V, E>) -> Result<Timed<V>, E> {
        let start_time = Instant::now();
        f().map(|value| Timed {
            value,
            elapsed: start_time.elapsed(),
        })
    }

    pub fn exceeds(&self, budget: Duration) -> bool {
        self.elapsed > budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_ok() {
        let timed = Timed::result(|| Ok::<_, ()>(42)).unwrap();
        assert_eq!(42, timed.value);
        assert!(!timed.exceeds(Duration::from_secs(60)));
    }

    #[test]
    fn result_err() {
        let err = Timed::<u32>::result(|| Err("boom")).unwrap_err();
        assert_eq!("boom", err);
    }

    #[test]
    fn exceeds() {
        let timed = Timed {
            value: (),
            elapsed: Duration::from_millis(10),
        };
        assert!(timed.exceeds(Duration::from_millis(9)));
        assert!(!timed.exceeds(Duration::from_millis(10)));
    }
}
