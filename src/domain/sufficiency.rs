// Expected "not enough data yet" states, kept out of the error path

#[derive(Debug, Clone, PartialEq)]
pub enum Sufficiency<T> {
    Ready(T),
    NotEnoughData { reason: String },
}

impl<T> Sufficiency<T> {
    pub fn not_enough(reason: impl Into<String>) -> Self {
        Sufficiency::NotEnoughData {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Sufficiency::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Sufficiency::Ready(value) => Some(value),
            Sufficiency::NotEnoughData { .. } => None,
        }
    }

    pub fn as_ref(&self) -> Sufficiency<&T> {
        match self {
            Sufficiency::Ready(value) => Sufficiency::Ready(value),
            Sufficiency::NotEnoughData { reason } => Sufficiency::NotEnoughData {
                reason: reason.clone(),
            },
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sufficiency<U> {
        match self {
            Sufficiency::Ready(value) => Sufficiency::Ready(f(value)),
            Sufficiency::NotEnoughData { reason } => Sufficiency::NotEnoughData { reason },
        }
    }

    /// Message shown in place of the metric, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Sufficiency::Ready(_) => None,
            Sufficiency::NotEnoughData { reason } => Some(reason),
        }
    }
}
