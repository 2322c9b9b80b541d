mod stored_value;
pub(crate) mod values;

use cnidarium::{
    StateDelta,
    StateWrite,
};
pub(crate) use stored_value::StoredValue;

/// Writes a successful operation's delta through to its parent, including the events it recorded.
///
/// Operations stage their writes in a [`StateDelta`] over the caller's state and only call this
/// once every step succeeded, so a failed operation leaves neither writes nor events behind.
pub(crate) fn commit<S: StateWrite>(delta: StateDelta<S>) {
    let (mut state, events) = delta.apply();
    for event in events {
        state.record(event);
    }
}
