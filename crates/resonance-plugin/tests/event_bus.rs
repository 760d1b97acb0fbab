//! Event bus delivery semantics under concurrent modification.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use resonance_plugin::EventBus;
use resonance_plugin::prelude::*;

fn counting(hits: Arc<AtomicUsize>) -> Arc<dyn EventHandler> {
    Arc::new(FnEventHandler::new(move |_| {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }))
}

#[tokio::test]
async fn test_unsubscribe_during_publish_applies_to_next_publish() {
    let bus = Arc::new(EventBus::new());
    let owner = PluginId::new();
    let victim: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
    let victim_hits = Arc::new(AtomicUsize::new(0));

    let remover = {
        let bus = bus.clone();
        let victim = victim.clone();
        Arc::new(FnEventHandler::new(move |_| {
            let bus = bus.clone();
            let target = *victim.lock().unwrap();
            async move {
                if let Some(id) = target {
                    bus.unsubscribe(id).await;
                }
                Ok(())
            }
        }))
    };

    bus.subscribe("t", remover, owner).await;
    let id = bus.subscribe("t", counting(victim_hits.clone()), owner).await;
    *victim.lock().unwrap() = Some(id);

    bus.publish(&Event::new("t")).await;
    assert_eq!(victim_hits.load(Ordering::SeqCst), 1);

    bus.publish(&Event::new("t")).await;
    assert_eq!(victim_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_subscribe_during_publish_applies_to_next_publish() {
    let bus = Arc::new(EventBus::new());
    let owner = PluginId::new();
    let late_hits = Arc::new(AtomicUsize::new(0));
    let subscribed = Arc::new(AtomicUsize::new(0));

    let adder = {
        let bus = bus.clone();
        let late_hits = late_hits.clone();
        let subscribed = subscribed.clone();
        Arc::new(FnEventHandler::new(move |_| {
            let bus = bus.clone();
            let late_hits = late_hits.clone();
            let subscribed = subscribed.clone();
            async move {
                if subscribed.fetch_add(1, Ordering::SeqCst) == 0 {
                    bus.subscribe("t", counting(late_hits), owner).await;
                }
                Ok(())
            }
        }))
    };
    bus.subscribe("t", adder, owner).await;

    bus.publish(&Event::new("t")).await;
    assert_eq!(late_hits.load(Ordering::SeqCst), 0);

    bus.publish(&Event::new("t")).await;
    assert_eq!(late_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_publish_with_no_subscribers_is_noop() {
    let bus = EventBus::new();
    bus.publish(&Event::new(topics::SERVER_STARTED)).await;
    assert_eq!(bus.subscriber_count(topics::SERVER_STARTED).await, 0);
}
