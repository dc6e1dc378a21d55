//! Amplifier pipelines: several copies of one program wired output-to-input.

use log::debug;

use crate::{Machine, Program, Result, VmError};

/// Runs one fresh machine per phase, each fed `[phase, signal]`, and returns the
/// signal coming out of the last stage.
pub fn run_chain(program: &Program, phases: &[i64], signal: i64) -> Result<i64> {
    phases
        .iter()
        .enumerate()
        .try_fold(signal, |signal, (stage, &phase)| {
            let mut amp = Machine::from_program(program)?;
            amp.run(&[phase, signal])?
                .first()
                .copied()
                .ok_or(VmError::NoSignal { stage })
        })
}

/// Wires the last stage back into the first and keeps cycling until the last
/// stage halts. Returns the last signal it produced.
pub fn run_feedback_loop(program: &Program, phases: &[i64], signal: i64) -> Result<i64> {
    let last = match phases.len().checked_sub(1) {
        Some(last) => last,
        None => return Ok(signal),
    };

    let mut amps = phases
        .iter()
        .map(|_| Machine::from_program(program))
        .collect::<Result<Vec<_>>>()?;

    // First pass carries each stage's phase setting ahead of the signal.
    let mut signals = vec![signal];
    for (amp, &phase) in amps.iter_mut().zip(phases) {
        let mut inputs = Vec::with_capacity(signals.len() + 1);
        inputs.push(phase);
        inputs.extend(signals);
        signals = amp.run(&inputs)?;
    }
    let mut last_signal = signals.last().copied();

    let mut rounds = 1;
    while !amps[last].halted() {
        if signals.is_empty() {
            return Err(VmError::NoSignal { stage: last });
        }
        for amp in amps.iter_mut() {
            signals = amp.run(&signals)?;
        }
        if let Some(&value) = signals.last() {
            last_signal = Some(value);
        }
        rounds += 1;
    }

    debug!("feedback loop settled after {} rounds", rounds);
    last_signal.ok_or(VmError::NoSignal { stage: last })
}

/// Tries every ordering of `phases` and returns the highest final signal, starting
/// from a signal of 0.
pub fn max_signal(program: &Program, phases: &[i64], feedback: bool) -> Result<i64> {
    let mut best: Option<i64> = None;
    for order in permutations(phases) {
        let signal = if feedback {
            run_feedback_loop(program, &order, 0)?
        } else {
            run_chain(program, &order, 0)?
        };
        best = Some(best.map_or(signal, |best| best.max(signal)));
    }
    best.ok_or(VmError::NoSignal { stage: 0 })
}

fn permutations(items: &[i64]) -> Vec<Vec<i64>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }

    let mut result = Vec::new();
    for (i, &head) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            result.push(tail);
        }
    }
    result
}
