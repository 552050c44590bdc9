/// Handles for long-lived listener registrations (auth changes, live channels)

/// A registration that can be released exactly once
pub trait Subscription {
    fn unsubscribe(&mut self);
}

/// Owns a registration and releases it when dropped
pub struct SubscriptionGuard {
    inner: Option<Box<dyn Subscription>>,
}

impl SubscriptionGuard {
    pub fn new(subscription: impl Subscription + 'static) -> SubscriptionGuard {
        SubscriptionGuard {
            inner: Some(Box::new(subscription)),
        }
    }

    /// Release now instead of waiting for drop
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut subscription) = self.inner.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("active", &self.inner.is_some())
            .finish()
    }
}
