use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::Error;
use crate::machine::Machine;
use crate::runner::{Runner, State};
use crate::tty::RecordingTty;

fn machine_with(code: &[u8]) -> Machine {
    let (tty, _) = RecordingTty::new();
    let mut machine = Machine::deterministic(Box::new(tty));
    machine.load_com(code).unwrap();
    machine
}

/// polls until the condition holds or a generous deadline passes
fn wait_for<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn runs_a_program_to_completion() {
    let machine = machine_with(&[
        0xB8, 0x2A, 0x4C, // mov ax,0x4c2a
        0xCD, 0x21,       // int 0x21
    ]);
    let mut runner = Runner::new(machine);
    runner.start();
    let (machine, error) = runner.wait();
    assert!(error.is_none());
    assert_eq!(true, machine.cpu.terminated);
    assert_eq!(0x2A, machine.cpu.exit_code);
}

#[test]
fn surfaces_fatal_errors_with_the_last_address() {
    let machine = machine_with(&[0x0F]); // not a valid instruction here
    let mut runner = Runner::new(machine);
    runner.start();
    let (machine, error) = runner.wait();
    match error {
        Some(Error::UnhandledInstruction(_, cs, ip)) => {
            assert_eq!(0x1000, cs);
            assert_eq!(0x0100, ip);
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(0x1000, machine.cpu.regs.last_cs);
    assert_eq!(0x0100, machine.cpu.regs.last_ip);
}

#[test]
fn stop_interrupts_a_spinning_program() {
    let machine = machine_with(&[0xEB, 0xFE]); // jmp $
    let mut runner = Runner::new(machine);

    let states: Arc<Mutex<Vec<State>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = states.clone();
    runner.register_state_changed_callback(move |state| seen.lock().push(state));

    runner.start();
    runner.stop();
    let (machine, error) = runner.join();
    assert!(error.is_none());
    assert_eq!(false, machine.cpu.terminated);
    assert_eq!(Some(&State::Stopped), states.lock().last());
}

#[test]
fn pause_freezes_the_machine_and_resume_continues() {
    // a loop that prints forever
    let (tty, output) = RecordingTty::new();
    let mut machine = Machine::deterministic(Box::new(tty));
    machine
        .load_com(&[
            0xB4, 0x0E, // mov ah,0x0e
            0xB0, 0x2E, // mov al,'.'
            0xCD, 0x10, // int 0x10
            0xEB, 0xF8, // jmp short back to the start
        ])
        .unwrap();
    let mut runner = Runner::new(machine);

    let states: Arc<Mutex<Vec<State>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = states.clone();
    let handle = runner.register_state_changed_callback(move |state| seen.lock().push(state));

    runner.start();
    wait_for("first output", || !output.lock().is_empty());

    runner.set_paused(true);
    wait_for("pause callback", || states.lock().contains(&State::Paused));

    // while paused, nothing changes
    let frozen = output.lock().len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(frozen, output.lock().len());

    runner.set_paused(false);
    wait_for("more output after resume", || output.lock().len() > frozen);

    runner.unregister_state_changed_callback(handle);
    runner.stop();
    let (_, error) = runner.join();
    assert!(error.is_none());

    // transitions arrived in order on the CPU thread
    let seen = states.lock();
    let paused_at = seen.iter().position(|s| *s == State::Paused).unwrap();
    assert!(seen[paused_at + 1..].contains(&State::Running));
}

#[test]
fn callbacks_report_termination_as_stopped() {
    let machine = machine_with(&[
        0xB8, 0x00, 0x4C, // mov ax,0x4c00
        0xCD, 0x21,       // int 0x21
    ]);
    let mut runner = Runner::new(machine);
    let states: Arc<Mutex<Vec<State>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = states.clone();
    runner.register_state_changed_callback(move |state| seen.lock().push(state));

    runner.start();
    let (machine, error) = runner.wait();
    assert!(error.is_none());
    assert_eq!(true, machine.cpu.terminated);
    assert_eq!(Some(&State::Stopped), states.lock().last());
}
