use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::time::{advance, sleep};

use super::*;

fn counter() -> (Arc<AtomicU32>, impl Fn() -> u32) {
	let count = Arc::new(AtomicU32::new(0));
	let read = {
		let count = count.clone();
		move || count.load(Ordering::SeqCst)
	};
	(count, read)
}

fn bump(count: &Arc<AtomicU32>) -> impl FnOnce() + Send + 'static {
	let count = count.clone();
	move || {
		count.fetch_add(1, Ordering::SeqCst);
	}
}

/// Let spawned timer tasks run between clock manipulations.
async fn settle() {
	for _ in 0..4 {
		tokio::task::yield_now().await;
	}
}

#[tokio::test(start_paused = true)]
async fn test_fires_once_after_delay() {
	let mut debouncer: Debouncer<&str> = Debouncer::new();
	let (count, fired) = counter();

	debouncer.schedule("sync", Duration::from_millis(50), bump(&count));
	settle().await;
	assert_eq!(fired(), 0);
	assert!(debouncer.is_armed(&"sync"));

	advance(Duration::from_millis(51)).await;
	settle().await;
	assert_eq!(fired(), 1);
	assert!(!debouncer.is_armed(&"sync"));
}

#[tokio::test(start_paused = true)]
async fn test_last_call_wins() {
	let mut debouncer: Debouncer<&str> = Debouncer::new();
	let (first, first_fired) = counter();
	let (second, second_fired) = counter();

	debouncer.schedule("sync", Duration::from_millis(50), bump(&first));
	settle().await;
	advance(Duration::from_millis(30)).await;
	debouncer.schedule("sync", Duration::from_millis(50), bump(&second));
	settle().await;

	// The first timer's window elapses; it must not fire.
	advance(Duration::from_millis(30)).await;
	settle().await;
	assert_eq!(first_fired(), 0);
	assert_eq!(second_fired(), 0);

	advance(Duration::from_millis(25)).await;
	settle().await;
	assert_eq!(first_fired(), 0);
	assert_eq!(second_fired(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_burst_coalesces_to_one_firing() {
	let mut debouncer: Debouncer<&str> = Debouncer::new();
	let (count, fired) = counter();

	for _ in 0..10 {
		debouncer.schedule("save", Duration::from_millis(50), bump(&count));
		advance(Duration::from_millis(5)).await;
	}
	advance(Duration::from_millis(100)).await;
	settle().await;

	assert_eq!(fired(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_firing() {
	let mut debouncer: Debouncer<&str> = Debouncer::new();
	let (count, fired) = counter();

	debouncer.schedule("save", Duration::from_millis(50), bump(&count));
	debouncer.cancel(&"save");
	assert!(!debouncer.is_armed(&"save"));

	advance(Duration::from_millis(100)).await;
	settle().await;
	assert_eq!(fired(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_keys_are_independent() {
	let mut debouncer: Debouncer<&str> = Debouncer::new();
	let (sync_count, sync_fired) = counter();
	let (save_count, save_fired) = counter();

	debouncer.schedule("sync", Duration::from_millis(50), bump(&sync_count));
	debouncer.schedule("save", Duration::from_millis(200), bump(&save_count));

	// Rearming one key leaves the other untouched.
	debouncer.schedule("sync", Duration::from_millis(50), bump(&sync_count));
	settle().await;

	advance(Duration::from_millis(60)).await;
	settle().await;
	assert_eq!(sync_fired(), 1);
	assert_eq!(save_fired(), 0);

	advance(Duration::from_millis(200)).await;
	settle().await;
	assert_eq!(save_fired(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_drops_every_key() {
	let mut debouncer: Debouncer<u32> = Debouncer::new();
	let (count, fired) = counter();

	for key in 0..5 {
		debouncer.schedule(key, Duration::from_millis(50), bump(&count));
	}
	debouncer.cancel_all();

	advance(Duration::from_millis(100)).await;
	settle().await;
	assert_eq!(fired(), 0);
	for key in 0..5 {
		assert!(!debouncer.is_armed(&key));
	}
}

#[tokio::test(start_paused = true)]
async fn test_firing_is_asynchronous() {
	let mut debouncer: Debouncer<&str> = Debouncer::new();
	let (count, fired) = counter();

	debouncer.schedule("sync", Duration::ZERO, bump(&count));
	// Zero-delay actions still fire on the runtime, not inline.
	assert_eq!(fired(), 0);

	sleep(Duration::from_millis(1)).await;
	settle().await;
	assert_eq!(fired(), 1);
}
