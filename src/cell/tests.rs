use std::{cell::RefCell, rc::Rc};

use assert_call::{call, CallRecorder};
use rstest::rstest;

use super::*;

#[test]
fn new() {
    let c = ValueCell::new(10);
    assert_eq!(c.get(), 10);
    assert_eq!(c.version(), 0);
}

#[test]
fn set() {
    let c = ValueCell::new(10);
    c.set(20);
    assert_eq!(c.get(), 20);

    c.set(30);
    assert_eq!(c.get(), 30);
    assert_eq!(c.version(), 2);
}

#[test]
fn subscribe_does_not_call_with_current_value() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(10);
    let _s = c.subscribe(|v| call!("{v}"));
    cr.verify(());
}

#[test]
fn subscribers_observe_every_write_in_order() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(22);
    let _s = c.subscribe(|v| call!("{v}"));
    c.set(22);
    c.set(23);
    cr.verify(["22", "23"]);
    assert_eq!(c.get(), 23);
}

#[test]
fn updater_writes_compose() {
    let c = ValueCell::new(15);
    c.update_with(|v| v + 1);
    c.update_with(|v| v + 1);
    assert_eq!(c.get(), 17);
}

#[rstest]
#[case(Next::Value(5), 5)]
#[case(Next::update(|v: &i32| v * 3), 30)]
fn next_resolve(#[case] next: Next<i32>, #[case] expected: i32) {
    let c = ValueCell::new(10);
    c.update(next);
    assert_eq!(c.get(), expected);
}

#[test]
fn update_accepts_literal() {
    let c = ValueCell::new(String::new());
    c.update("X".to_string());
    assert_eq!(c.get(), "X");
}

#[test]
fn all_subscribers_are_notified() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let _s0 = c.subscribe(|v| call!("a{v}"));
    let _s1 = c.subscribe(|v| call!("b{v}"));
    c.set(1);
    cr.verify(["a1", "b1"]);
}

#[test]
fn dropped_subscription_is_not_notified() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let s = c.subscribe(|v| call!("{v}"));
    c.set(1);
    cr.verify("1");

    drop(s);
    assert_eq!(c.subscriber_count(), 0);
    c.set(2);
    cr.verify(());
}

#[test]
fn unsubscribe_twice_removes_only_own_listener() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let mut s0 = c.subscribe(|v| call!("a{v}"));
    s0.unsubscribe();
    let _s1 = c.subscribe(|v| call!("b{v}"));
    s0.unsubscribe();
    assert_eq!(c.subscriber_count(), 1);
    c.set(1);
    cr.verify("b1");
}

#[test]
fn unsubscribe_other_during_notify() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let _s0 = c.subscribe({
        let victim = victim.clone();
        move |v| {
            call!("a{v}");
            victim.borrow_mut().take();
        }
    });
    *victim.borrow_mut() = Some(c.subscribe(|v| call!("b{v}")));
    let _s2 = c.subscribe(|v| call!("c{v}"));

    c.set(1);
    cr.verify(["a1", "c1"]);
    assert_eq!(c.subscriber_count(), 2);
}

#[test]
fn unsubscribe_self_during_notify() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let own: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    *own.borrow_mut() = Some(c.subscribe({
        let own = own.clone();
        move |v| {
            call!("a{v}");
            own.borrow_mut().take();
        }
    }));
    let _s1 = c.subscribe(|v| call!("b{v}"));

    c.set(1);
    cr.verify(["a1", "b1"]);
    c.set(2);
    cr.verify("b2");
}

#[test]
fn subscribe_during_notify_is_not_called_in_same_pass() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let added: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));
    let _s = c.subscribe({
        let c = c.clone();
        let added = added.clone();
        move |v| {
            call!("a{v}");
            if added.borrow().is_empty() {
                added.borrow_mut().push(c.subscribe(|v| call!("b{v}")));
            }
        }
    });
    c.set(1);
    cr.verify("a1");
    c.set(2);
    cr.verify(["a2", "b2"]);
}

#[test]
fn nested_update_is_delivered_after_current_pass() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let _s0 = c.subscribe({
        let c = c.clone();
        move |&v| {
            call!("a{v}");
            if v == 1 {
                c.set(2);
            }
        }
    });
    let _s1 = c.subscribe(|v| call!("b{v}"));
    c.set(1);
    cr.verify(["a1", "b1", "a2", "b2"]);
    assert_eq!(c.get(), 2);
}

#[test]
fn nested_updates_are_delivered_in_write_order() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let _s0 = c.subscribe({
        let c = c.clone();
        move |&v| {
            call!("a{v}");
            if v == 1 {
                c.set(2);
                c.update_with(|v| v + 1);
            }
        }
    });
    let _s1 = c.subscribe({
        let c = c.clone();
        move |v| call!("b{v}:{}", c.get())
    });
    c.set(1);
    cr.verify(["a1", "b1:3", "a2", "b2:3", "a3", "b3:3"]);
    assert_eq!(c.get(), 3);
    assert_eq!(c.version(), 3);
}

#[test]
fn update_after_panicking_listener() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let s = c.subscribe(|&v| {
        if v == 1 {
            panic!("listener failed");
        }
    });
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| c.set(1)));
    assert!(result.is_err());
    drop(s);
    let _s = c.subscribe(|v| call!("{v}"));
    c.set(2);
    cr.verify("2");
}

#[test]
fn listener_can_read_cell() {
    let mut cr = CallRecorder::new();
    let c = ValueCell::new(0);
    let _s = c.subscribe({
        let c = c.clone();
        move |v| call!("{v}:{}", c.get())
    });
    c.set(5);
    cr.verify("5:5");
}

#[test]
fn cells_are_independent() {
    let mut cr = CallRecorder::new();
    let a = ValueCell::new(0);
    let b = ValueCell::new(0);
    let _s = b.subscribe(|v| call!("b{v}"));
    a.set(1);
    cr.verify(());
    assert_eq!(b.get(), 0);
}

#[test]
fn subscription_outlives_cell() {
    let c = ValueCell::new(0);
    let s = c.subscribe(|_| {});
    drop(c);
    drop(s);
}

#[test]
fn clone_shares_value() {
    let a = ValueCell::new(1);
    let b = a.clone();
    b.set(2);
    assert_eq!(a.get(), 2);
    assert!(a.ptr_eq(&b));
    assert_eq!(a.id(), b.id());
    assert_ne!(a.id(), ValueCell::new(2).id());
}

#[test]
fn debug_prints_value() {
    let c = ValueCell::new(42);
    assert_eq!(format!("{c:?}"), "42");
}

#[test]
fn serde_value_only() {
    let c = ValueCell::new(vec![1, 2]);
    let json = serde_json::to_string(&c).unwrap();
    assert_eq!(json, "[1,2]");
    let c: ValueCell<Vec<i32>> = serde_json::from_str(&json).unwrap();
    assert_eq!(c.get(), vec![1, 2]);
}
