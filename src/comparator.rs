use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::var::Var;

/// A caller-supplied total order over keys.
///
/// Every tree is built around one comparator and uses nothing else to order,
/// find, or deduplicate its keys. Two keys are the same key exactly when the
/// comparator returns [`Ordering::Equal`] for them.
///
/// The comparator must describe a strict total order. A comparator that is not
/// transitive, or that changes its answers over time, leaves the tree in an
/// unspecified (but memory-safe) state.
///
/// Cloning a `Comparator` is cheap: the closure is shared behind an [`Arc`].
///
/// # Examples
///
/// ```
/// use gtree::Comparator;
/// use std::cmp::Ordering;
///
/// let by_len = Comparator::new(|a: &String, b: &String| a.len().cmp(&b.len()));
/// assert_eq!(by_len.compare(&"ab".to_string(), &"c".to_string()), Ordering::Greater);
///
/// // The `(a, b) -> int` form: negative, zero, positive.
/// let ints = Comparator::from_sign(|a: &i32, b: &i32| i64::from(*a) - i64::from(*b));
/// assert_eq!(ints.compare(&1, &2), Ordering::Less);
/// ```
pub struct Comparator<K: ?Sized> {
    compare: Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
}

impl<K: ?Sized> Comparator<K> {
    /// Wraps a closure returning an [`Ordering`].
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(compare),
        }
    }

    /// Wraps a closure following the signed-integer convention: negative when
    /// `a < b`, zero when equal, positive when `a > b`.
    pub fn from_sign<F>(compare: F) -> Self
    where
        F: Fn(&K, &K) -> i64 + Send + Sync + 'static,
    {
        Self::new(move |a, b| compare(a, b).cmp(&0))
    }

    /// Compares two keys.
    #[inline]
    pub fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.compare)(a, b)
    }

    /// Returns a comparator ordering keys the opposite way.
    #[must_use]
    pub fn reverse(&self) -> Self
    where
        K: 'static,
    {
        let inner = Arc::clone(&self.compare);
        Self {
            compare: Arc::new(move |a, b| inner(b, a)),
        }
    }
}

impl<K: Ord + ?Sized> Comparator<K> {
    /// The natural order of `K`.
    #[must_use]
    pub fn natural() -> Self {
        Self::new(|a: &K, b: &K| a.cmp(b))
    }
}

impl<K: ?Sized> Clone for Comparator<K> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<K: Ord + ?Sized> Default for Comparator<K> {
    fn default() -> Self {
        Self::natural()
    }
}

impl<K: ?Sized> fmt::Debug for Comparator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Comparator")
    }
}

/// Orders dynamic keys as integers.
///
/// # Panics
///
/// The returned comparator panics when either key is not an integer. Mixing key
/// types in a tree ordered this way is a programming error.
#[must_use]
pub fn var_int() -> Comparator<Var> {
    Comparator::new(|a: &Var, b: &Var| as_int(a).cmp(&as_int(b)))
}

/// Orders dynamic keys by their string form. Strings compare by their
/// contents, every other value by its JSON text.
#[must_use]
pub fn var_string() -> Comparator<Var> {
    Comparator::new(|a: &Var, b: &Var| match (a, b) {
        (Var::String(a), Var::String(b)) => a.cmp(b),
        _ => var_text(a).cmp(&var_text(b)),
    })
}

/// Orders dynamic keys numerically when both are numbers and by string form
/// otherwise.
#[must_use]
pub fn var_natural() -> Comparator<Var> {
    Comparator::new(|a: &Var, b: &Var| match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => var_text(a).cmp(&var_text(b)),
    })
}

fn as_int(value: &Var) -> i128 {
    if let Some(i) = value.as_i64() {
        i128::from(i)
    } else if let Some(u) = value.as_u64() {
        i128::from(u)
    } else {
        panic!("comparator expects integer keys, got `{value}`")
    }
}

pub(crate) fn var_text(value: &Var) -> String {
    match value {
        Var::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_sign_maps_to_ordering() {
        let cmp = Comparator::from_sign(|a: &i32, b: &i32| i64::from(*a) - i64::from(*b));
        assert_eq!(cmp.compare(&1, &2), Ordering::Less);
        assert_eq!(cmp.compare(&2, &2), Ordering::Equal);
        assert_eq!(cmp.compare(&3, &2), Ordering::Greater);
    }

    #[test]
    fn reverse_flips_order() {
        let cmp = Comparator::<i32>::natural().reverse();
        assert_eq!(cmp.compare(&1, &2), Ordering::Greater);
    }

    #[test]
    fn var_string_compares_text() {
        let cmp = var_string();
        assert_eq!(cmp.compare(&json!("key10"), &json!("key2")), Ordering::Less);
        assert_eq!(cmp.compare(&json!(10), &json!("10")), Ordering::Equal);
    }

    #[test]
    fn var_natural_prefers_numbers() {
        let cmp = var_natural();
        assert_eq!(cmp.compare(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(cmp.compare(&json!("b"), &json!("a")), Ordering::Greater);
    }

    #[test]
    #[should_panic(expected = "comparator expects integer keys")]
    fn var_int_rejects_strings() {
        let _ = var_int().compare(&json!(1), &json!("one"));
    }
}
