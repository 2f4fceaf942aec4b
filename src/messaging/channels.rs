// Communication channels lock-free

use crate::messaging::notification::Notification;
use ringbuf::{HeapRb, traits::Split};

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Consumer, Producer};

    #[test]
    fn test_notification_channel_roundtrip() {
        let (mut tx, mut rx) = create_notification_channel(8);

        tx.try_push(Notification::SequenceChanged).unwrap();
        tx.try_push(Notification::ReleaseAllKeys).unwrap();

        assert_eq!(rx.try_pop(), Some(Notification::SequenceChanged));
        assert_eq!(rx.try_pop(), Some(Notification::ReleaseAllKeys));
        assert_eq!(rx.try_pop(), None);
    }
}
