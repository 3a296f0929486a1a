use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::error::Error;
use crate::machine::Machine;

#[cfg(test)]
#[path = "./runner_test.rs"]
mod runner_test;

/// how many instructions run between host yields
const YIELD_INTERVAL: usize = 4096;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum State {
    Stopped,
    Running,
    Paused,
}

impl State {
    fn from_u8(v: u8) -> State {
        match v {
            1 => State::Running,
            2 => State::Paused,
            _ => State::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            State::Stopped => 0,
            State::Running => 1,
            State::Paused => 2,
        }
    }
}

type StateCallback = Box<dyn Fn(State) + Send>;

/// returned by callback registration, consumed by removal
#[derive(Debug, PartialEq)]
pub struct CallbackHandle(u64);

/// the control surface shared between the host and the CPU thread. the
/// requested state is an atomic the CPU samples between instructions,
/// never mid-instruction
struct Control {
    requested: AtomicU8,
    pause_lock: Mutex<()>,
    resumed: Condvar,
    callbacks: Mutex<Vec<(u64, StateCallback)>>,
    next_callback_id: AtomicU64,
}

impl Control {
    fn requested(&self) -> State {
        State::from_u8(self.requested.load(Ordering::Acquire))
    }

    fn request(&self, state: State) {
        self.requested.store(state.as_u8(), Ordering::Release);
    }

    /// state-changed callbacks run on the CPU's own execution context
    fn fire(&self, state: State) {
        for (_, callback) in self.callbacks.lock().iter() {
            callback(state);
        }
    }
}

/// drives a machine on a dedicated CPU thread. the host interacts with
/// it only through start/stop/pause and the state callbacks
pub struct Runner {
    control: Arc<Control>,
    machine: Option<Machine>,
    thread: Option<JoinHandle<(Machine, Option<Error>)>>,
}

impl Runner {
    /// takes ownership of the machine. callbacks can be registered
    /// before the CPU thread exists
    pub fn new(machine: Machine) -> Self {
        let control = Arc::new(Control {
            requested: AtomicU8::new(State::Stopped.as_u8()),
            pause_lock: Mutex::new(()),
            resumed: Condvar::new(),
            callbacks: Mutex::new(Vec::new()),
            next_callback_id: AtomicU64::new(1),
        });
        Runner {
            control,
            machine: Some(machine),
            thread: None,
        }
    }

    /// starts executing on a fresh CPU thread
    pub fn start(&mut self) {
        let machine = match self.machine.take() {
            Some(machine) => machine,
            None => return,
        };
        self.control.request(State::Running);
        let control = self.control.clone();
        self.thread = Some(thread::spawn(move || run_loop(machine, &control)));
    }

    /// requests a stop. does not block; join() waits for the thread
    pub fn stop(&self) {
        // the pause lock orders the store against the check-then-wait of
        // a pausing CPU thread
        let _guard = self.control.pause_lock.lock();
        self.control.request(State::Stopped);
        self.control.resumed.notify_all();
    }

    pub fn set_paused(&self, paused: bool) {
        let _guard = self.control.pause_lock.lock();
        if paused {
            self.control.request(State::Paused);
        } else {
            self.control.request(State::Running);
            self.control.resumed.notify_all();
        }
    }

    pub fn register_state_changed_callback<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(State) + Send + 'static,
    {
        let id = self.control.next_callback_id.fetch_add(1, Ordering::Relaxed);
        self.control.callbacks.lock().push((id, Box::new(callback)));
        CallbackHandle(id)
    }

    pub fn unregister_state_changed_callback(&self, handle: CallbackHandle) {
        self.control.callbacks.lock().retain(|(id, _)| *id != handle.0);
    }

    /// waits for the CPU thread and hands the machine back, along with
    /// the fatal error that stopped it, if any
    pub fn join(mut self) -> (Machine, Option<Error>) {
        {
            let _guard = self.control.pause_lock.lock();
            self.control.request(State::Stopped);
            self.control.resumed.notify_all();
        }
        self.take_machine()
    }

    /// waits for the CPU thread without requesting a stop, so the run
    /// ends on program termination or a fatal fault
    pub fn wait(mut self) -> (Machine, Option<Error>) {
        self.take_machine()
    }

    fn take_machine(&mut self) -> (Machine, Option<Error>) {
        match self.thread.take() {
            Some(thread) => match thread.join() {
                Ok(result) => result,
                Err(_) => panic!("CPU thread panicked"),
            },
            None => match self.machine.take() {
                Some(machine) => (machine, None),
                None => panic!("runner was never given a machine"),
            },
        }
    }
}

fn run_loop(mut machine: Machine, control: &Control) -> (Machine, Option<Error>) {
    control.fire(State::Running);

    let error = loop {
        match control.requested() {
            State::Stopped => break None,
            State::Paused => {
                control.fire(State::Paused);
                {
                    let mut guard = control.pause_lock.lock();
                    while control.requested() == State::Paused {
                        control.resumed.wait(&mut guard);
                    }
                }
                if control.requested() == State::Stopped {
                    break None;
                }
                control.fire(State::Running);
            }
            State::Running => {
                if machine.cpu.terminated {
                    break None;
                }
                if let Err(err) = machine.tick() {
                    error!("fatal error at {:04X}:{:04X}: {}",
                           machine.cpu.regs.last_cs, machine.cpu.regs.last_ip, err);
                    break Some(err);
                }
                if machine.cpu.instruction_count % YIELD_INTERVAL == 0 {
                    // let the host sample our state without taking a
                    // lock on every instruction
                    thread::yield_now();
                }
            }
        }
    };

    control.request(State::Stopped);
    control.fire(State::Stopped);
    (machine, error)
}
