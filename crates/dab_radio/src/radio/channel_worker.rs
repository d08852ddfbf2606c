use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

struct WorkerState {
    buffer: Vec<i8>,
    is_start: bool,
    is_done: bool,
    is_terminated: bool,
}

struct WorkerShared {
    state: Mutex<WorkerState>,
    cv_start: Condvar,
    cv_done: Condvar,
}

/// A dedicated decoding thread driven by per frame start and join signals.
///
/// The dispatcher copies a frame's bits into the worker, signals the start condition
/// and later joins on the done condition; the worker runs its task to completion
/// without blocking in between. Stopping wakes the thread and lets any in flight frame
/// finish.
pub struct ChannelWorker {
    shared: Arc<WorkerShared>,
    thread: Option<JoinHandle<()>>,
}

impl ChannelWorker {
    pub fn new(mut task: impl FnMut(&[i8]) + Send + 'static) -> Self {
        let shared = Arc::new(WorkerShared {
            state: Mutex::new(WorkerState {
                buffer: Vec::new(),
                is_start: false,
                is_done: true,
                is_terminated: false,
            }),
            cv_start: Condvar::new(),
            cv_done: Condvar::new(),
        });

        let thread = std::thread::spawn({
            let shared = shared.clone();
            move || loop {
                let mut state = shared.state.lock().unwrap();
                while !state.is_start && !state.is_terminated {
                    state = shared.cv_start.wait(state).unwrap();
                }
                if state.is_terminated {
                    state.is_done = true;
                    shared.cv_done.notify_all();
                    return;
                }
                state.is_start = false;
                task(&state.buffer);
                state.is_done = true;
                shared.cv_done.notify_all();
            }
        });

        Self { shared, thread: Some(thread) }
    }

    /// Hands one frame's bits to the worker and wakes it.
    pub fn start(&self, bits: &[i8]) {
        let mut state = self.shared.state.lock().unwrap();
        state.buffer.clear();
        state.buffer.extend_from_slice(bits);
        state.is_start = true;
        state.is_done = false;
        self.shared.cv_start.notify_all();
    }

    /// Blocks until the worker has finished the current frame.
    pub fn join(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while !state.is_done {
            state = self.shared.cv_done.wait(state).unwrap();
        }
    }

    /// Signals termination and joins the thread. Any in flight frame completes first.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.is_terminated = true;
            self.shared.cv_start.notify_all();
            self.shared.cv_done.notify_all();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ChannelWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn frames_are_processed_in_order() {
        let processed = Arc::new(Mutex::new(Vec::new()));
        let mut worker = ChannelWorker::new({
            let processed = processed.clone();
            move |bits: &[i8]| {
                processed.lock().unwrap().push(bits.to_vec());
            }
        });

        for value in 0..4i8 {
            worker.start(&[value; 8]);
            worker.join();
        }
        worker.stop();

        let processed = processed.lock().unwrap();
        assert_eq!(processed.len(), 4);
        for (value, frame) in processed.iter().enumerate() {
            assert_eq!(frame, &vec![value as i8; 8]);
        }
    }

    #[test]
    fn stop_without_start_terminates() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut worker = ChannelWorker::new({
            let counter = counter.clone();
            move |_bits: &[i8]| {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        worker.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn join_before_any_start_returns_immediately() {
        let worker = ChannelWorker::new(|_bits: &[i8]| {});
        worker.join();
    }
}
