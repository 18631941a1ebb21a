use std::sync::{Arc, Mutex};

use nanotick::schedule::Task;
use nanotick::time::{Clock, MILLI, SECOND};
use nanotick::{ControlledScheduler, Error, FixedStepReplayer, Timestamp};

fn ms(millis: i64) -> Timestamp {
    Timestamp::try_from_nanos(millis * MILLI).expect("valid")
}

fn tick(seen: Arc<Mutex<Vec<i64>>>) -> Task {
    Box::new(move |s: &ControlledScheduler| {
        seen.lock().expect("seen").push(s.current_time_millis());
        if s.current_time_millis() < 500 {
            s.schedule_after_delay_millis(100, tick(Arc::clone(&seen)))?;
        }
        Ok(())
    })
}

#[test]
fn periodic_task_follows_virtual_time() {
    let scheduler = ControlledScheduler::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    scheduler
        .schedule_after_delay_millis(100, tick(Arc::clone(&seen)))
        .expect("schedule");

    scheduler.run_through_millis(250).expect("drain");
    assert_eq!(*seen.lock().expect("seen"), vec![100, 200]);
    assert_eq!(scheduler.current_time_millis(), 250);

    scheduler.run_until_queue_empty().expect("drain");
    assert_eq!(*seen.lock().expect("seen"), vec![100, 200, 300, 400, 500]);
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn replayer_steps_drive_the_scheduler() {
    let replayer = FixedStepReplayer::new(ms(0), ms(1_000), 250 * MILLI).expect("replayer");
    let scheduler = ControlledScheduler::new(replayer.now());
    let fired = Arc::new(Mutex::new(Vec::new()));
    for at in [120, 480, 500, 990] {
        let fired = Arc::clone(&fired);
        scheduler.schedule_at(ms(at), move |s: &ControlledScheduler| {
            fired.lock().expect("fired").push((at, s.current_time_millis()));
            Ok(())
        });
    }

    let mut steps = 0;
    while !replayer.is_done() {
        let now = replayer.step();
        scheduler.run_through(now).expect("drain");
        steps += 1;
    }
    assert_eq!(steps, 4);
    assert_eq!(replayer.current_time_nanos(), SECOND);
    assert_eq!(
        *fired.lock().expect("fired"),
        vec![(120, 120), (480, 480), (500, 500), (990, 990)]
    );
    assert_eq!(scheduler.current_time_millis(), 1_000);
}

#[test]
fn task_failure_surfaces_and_leaves_later_work_queued() {
    let scheduler = ControlledScheduler::default();
    scheduler.schedule_at(ms(10), |_: &ControlledScheduler| anyhow::bail!("feed disconnected"));
    scheduler.schedule_at(ms(20), |_: &ControlledScheduler| Ok(()));

    let err = scheduler.run_until_queue_empty().expect_err("task error");
    assert!(matches!(err, Error::Task(_)));
    assert!(err.to_string().contains("feed disconnected"));
    assert_eq!(scheduler.pending(), 1);
    assert_eq!(scheduler.current_time_millis(), 10);
}
