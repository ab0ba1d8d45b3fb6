use parking_lot::Mutex;
use tether_core::{Loan, Node, Publisher};

use crate::Backend;
use crate::handle::{Handle, HandleData};
use crate::qos::QosProfile;
use crate::ret::{RetResult, fail, invalid_argument};

pub(crate) struct PublisherData {
    publisher: Mutex<Publisher<Backend>>,
    qos: QosProfile,
}

impl HandleData for PublisherData {
    const KIND: &'static str = "publisher";
}

pub fn create_publisher(
    node: &Handle,
    topic: &str,
    type_name: &str,
    qos: &QosProfile,
) -> RetResult<Handle> {
    const OP: &str = "create_publisher";
    let node = node.get::<Node<Backend>>().map_err(fail(OP))?;
    let config = qos.service_config(node.service_config());
    let publisher =
        Publisher::create(node.transport(), &config, topic, type_name).map_err(fail(OP))?;
    Ok(Handle::new(PublisherData {
        publisher: Mutex::new(publisher),
        qos: QosProfile::provided(&config),
    }))
}

pub fn destroy_publisher(publisher: &mut Option<Handle>) -> RetResult {
    let data = Handle::take::<PublisherData>(publisher).map_err(fail("destroy_publisher"))?;
    let publisher = data.publisher.into_inner();
    tracing::debug!(
        topic = %publisher.topic(),
        outstanding = publisher.outstanding_loans(),
        "destroyed publisher"
    );
    Ok(())
}

pub fn publish(publisher: &Handle, message: &[u8]) -> RetResult {
    const OP: &str = "publish";
    let data = publisher.get::<PublisherData>().map_err(fail(OP))?;
    data.publisher.lock().publish(message).map_err(fail(OP))
}

/// Borrow a zeroed buffer of `len` bytes to build a message in place.
pub fn borrow_loaned_message(publisher: &Handle, len: usize) -> RetResult<Loan> {
    const OP: &str = "borrow_loaned_message";
    let data = publisher.get::<PublisherData>().map_err(fail(OP))?;
    data.publisher.lock().borrow_loan(len).map_err(fail(OP))
}

pub fn publish_loaned_message(publisher: &Handle, message: *const u8) -> RetResult {
    const OP: &str = "publish_loaned_message";
    let data = publisher.get::<PublisherData>().map_err(fail(OP))?;
    if message.is_null() {
        return Err(invalid_argument(OP, "message"));
    }
    data.publisher.lock().publish_loan(message).map_err(fail(OP))
}

pub fn return_loaned_message_from_publisher(publisher: &Handle, message: *const u8) -> RetResult {
    const OP: &str = "return_loaned_message_from_publisher";
    let data = publisher.get::<PublisherData>().map_err(fail(OP))?;
    if message.is_null() {
        return Err(invalid_argument(OP, "message"));
    }
    data.publisher.lock().return_loan(message).map_err(fail(OP))
}

pub fn publisher_get_actual_qos(publisher: &Handle) -> RetResult<QosProfile> {
    let data = publisher
        .get::<PublisherData>()
        .map_err(fail("publisher_get_actual_qos"))?;
    Ok(data.qos)
}
