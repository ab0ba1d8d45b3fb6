use parking_lot::Mutex;
use tether_core::{Loan, Node, Subscriber};

use crate::Backend;
use crate::handle::{Handle, HandleData};
use crate::qos::QosProfile;
use crate::ret::{RetResult, fail, invalid_argument};

pub(crate) struct SubscriptionData {
    pub(crate) subscriber: Mutex<Subscriber<Backend>>,
    qos: QosProfile,
}

impl HandleData for SubscriptionData {
    const KIND: &'static str = "subscription";
}

/// Subscriptions receive only what is published after they are created.
pub fn create_subscription(
    node: &Handle,
    topic: &str,
    type_name: &str,
    qos: &QosProfile,
) -> RetResult<Handle> {
    const OP: &str = "create_subscription";
    let node = node.get::<Node<Backend>>().map_err(fail(OP))?;
    let config = qos.service_config(node.service_config());
    let subscriber =
        Subscriber::create(node.transport(), &config, topic, type_name).map_err(fail(OP))?;
    Ok(Handle::new(SubscriptionData {
        subscriber: Mutex::new(subscriber),
        qos: QosProfile::provided(&config),
    }))
}

pub fn destroy_subscription(subscription: &mut Option<Handle>) -> RetResult {
    let data =
        Handle::take::<SubscriptionData>(subscription).map_err(fail("destroy_subscription"))?;
    let subscriber = data.subscriber.into_inner();
    tracing::debug!(
        topic = %subscriber.topic(),
        outstanding = subscriber.outstanding_loans(),
        "destroyed subscription"
    );
    Ok(())
}

/// Copy the next message into `dest`. `Ok(None)` means nothing was taken.
pub fn take(subscription: &Handle, dest: &mut [u8]) -> RetResult<Option<usize>> {
    const OP: &str = "take";
    let data = subscription.get::<SubscriptionData>().map_err(fail(OP))?;
    data.subscriber.lock().take_copy(dest).map_err(fail(OP))
}

/// Loan out the next message. `Ok(None)` means nothing was taken.
pub fn take_loaned_message(subscription: &Handle) -> RetResult<Option<Loan>> {
    const OP: &str = "take_loaned_message";
    let data = subscription.get::<SubscriptionData>().map_err(fail(OP))?;
    data.subscriber.lock().take_loan().map_err(fail(OP))
}

pub fn return_loaned_message_from_subscription(
    subscription: &Handle,
    message: *const u8,
) -> RetResult {
    const OP: &str = "return_loaned_message_from_subscription";
    let data = subscription.get::<SubscriptionData>().map_err(fail(OP))?;
    if message.is_null() {
        return Err(invalid_argument(OP, "message"));
    }
    data.subscriber.lock().return_loan(message).map_err(fail(OP))
}

pub fn subscription_get_actual_qos(subscription: &Handle) -> RetResult<QosProfile> {
    let data = subscription
        .get::<SubscriptionData>()
        .map_err(fail("subscription_get_actual_qos"))?;
    Ok(data.qos)
}
