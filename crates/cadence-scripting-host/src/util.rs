//! Small helpers for script authors. None of these hold any state.

use rand::distributions::uniform::SampleUniform;
use rand::seq::SliceRandom;
use rand::Rng;
use std::thread;
use std::time::Duration;

/// Random value in `[0, max)`; `0` when `max` is not positive
pub fn random<T>(max: T) -> T
where
    T: SampleUniform + PartialOrd + Copy + Default,
{
    random_range(T::default(), max)
}

/// Random value in `[min, max)`; `min` when the range is empty
pub fn random_range<T>(min: T, max: T) -> T
where
    T: SampleUniform + PartialOrd + Copy,
{
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..max)
}

/// Random element of `items`, or `None` if it is empty
pub fn random_element<T>(items: &[T]) -> Option<&T> {
    items.choose(&mut rand::thread_rng())
}

/// Block the calling thread for `millis` milliseconds
pub fn sleep(millis: u64) {
    thread::sleep(Duration::from_millis(millis));
}

/// Block the calling thread for a random duration in `[min_millis, max_millis)`
pub fn sleep_between(min_millis: u64, max_millis: u64) {
    sleep(random_range(min_millis, max_millis));
}
