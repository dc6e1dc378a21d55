pub mod amplifier;
pub mod ascii;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod network;
pub mod program;

use std::collections::VecDeque;

use cpu::{Cpu, Instruction, Mode, OpCode};
use log::{debug, error, trace, warn};
use memory::{Addressable, Memory, PADDING_FACTOR};

pub use error::{Result, VmError};
pub use program::Program;

/// Where a machine stands between two calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not started yet, or returned right after producing an output.
    Ready,
    /// Parked on an input instruction; the next call retries it.
    SuspendedOnInput,
    Halted,
    /// Stopped on a fatal error; every later call fails.
    Faulted,
}

enum Step {
    Continue,
    NeedInput,
    Output(i64),
    Halted,
}

/// A resumable Intcode computer.
///
/// Registers, memory and queued input survive across calls to [`Machine::run`],
/// so an orchestrator can feed it input in as many batches as it likes.
#[derive(Debug, Clone)]
pub struct Machine {
    cpu: Cpu,
    memory: Memory,
    inputs: VecDeque<i64>,
    status: Status,
}

impl Machine {
    pub fn new(program_text: &str) -> Result<Self> {
        Self::from_program(&Program::parse(program_text)?)
    }

    pub fn from_program(program: &Program) -> Result<Self> {
        Self::with_padding(program, PADDING_FACTOR)
    }

    /// Builds a machine whose memory holds `padding_factor` zero cells per program cell
    /// after the program.
    pub fn with_padding(program: &Program, padding_factor: usize) -> Result<Self> {
        let mut memory = Memory::with_capacity_for(program.len(), padding_factor)?;
        memory.write_chunk(&program.data)?;

        debug!(
            "loaded {} cells into {} cells of memory",
            program.len(),
            memory.len()
        );

        Ok(Self {
            cpu: Cpu::new(),
            memory,
            inputs: VecDeque::new(),
            status: Status::Ready,
        })
    }

    pub fn halted(&self) -> bool {
        self.cpu.halt
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Runs until the program halts or asks for input that has not been supplied.
    ///
    /// Returns every value output during this call. On a halted machine this is a
    /// no-op returning no outputs.
    pub fn run(&mut self, inputs: &[i64]) -> Result<Vec<i64>> {
        let mut outputs = Vec::new();
        if !self.accept(inputs)? {
            return Ok(outputs);
        }

        loop {
            match self.step()? {
                Step::Continue => {}
                Step::Output(value) => outputs.push(value),
                Step::NeedInput | Step::Halted => return Ok(outputs),
            }
        }
    }

    /// Runs until the next output, returning it, or `None` if the machine halted or
    /// is waiting for input first.
    ///
    /// Inputs not consumed before the output is produced stay queued for the next call.
    pub fn run_until_output(&mut self, inputs: &[i64]) -> Result<Option<i64>> {
        if !self.accept(inputs)? {
            return Ok(None);
        }

        loop {
            match self.step()? {
                Step::Continue => {}
                Step::Output(value) => return Ok(Some(value)),
                Step::NeedInput | Step::Halted => return Ok(None),
            }
        }
    }

    /// Queues `inputs` and reports whether execution may proceed.
    fn accept(&mut self, inputs: &[i64]) -> Result<bool> {
        match self.status {
            Status::Faulted => Err(VmError::Faulted),
            Status::Halted => {
                warn!("run called on a halted machine, ignoring {} inputs", inputs.len());
                Ok(false)
            }
            Status::Ready | Status::SuspendedOnInput => {
                self.inputs.extend(inputs.iter().copied());
                self.status = Status::Ready;
                Ok(true)
            }
        }
    }

    fn step(&mut self) -> Result<Step> {
        match self.execute() {
            Ok(step) => Ok(step),
            Err(e) => {
                error!("machine faulted: {} ({})", e, self.cpu);
                self.status = Status::Faulted;
                Err(e)
            }
        }
    }

    /// Fetches, decodes and executes one instruction.
    fn execute(&mut self) -> Result<Step> {
        let ip = self.cpu.ip;
        let instr = Instruction::decode(ip, self.memory.read(ip as i64)?)?;

        trace!("ip {:>5}: {:?} {:?}", ip, instr.opcode, instr.modes);

        let step = match instr.opcode {
            OpCode::Add => {
                let value = self
                    .operand(&instr, 1)?
                    .checked_add(self.operand(&instr, 2)?)
                    .ok_or(VmError::Overflow { ip, op: "add" })?;
                self.store(&instr, 3, value)?;
                Step::Continue
            }
            OpCode::Multiply => {
                let value = self
                    .operand(&instr, 1)?
                    .checked_mul(self.operand(&instr, 2)?)
                    .ok_or(VmError::Overflow { ip, op: "multiply" })?;
                self.store(&instr, 3, value)?;
                Step::Continue
            }
            OpCode::Input => {
                // Resolve the target before consuming, so a bad target leaves the queue intact.
                let address = self.store_address(&instr, 1)?;
                match self.inputs.pop_front() {
                    Some(value) => {
                        self.memory.write(address, value)?;
                        Step::Continue
                    }
                    None => {
                        debug!("suspended on input at ip {}", ip);
                        self.status = Status::SuspendedOnInput;
                        return Ok(Step::NeedInput);
                    }
                }
            }
            OpCode::Output => Step::Output(self.operand(&instr, 1)?),
            OpCode::JumpIfTrue => {
                if self.operand(&instr, 1)? != 0 {
                    return self.jump(&instr);
                }
                Step::Continue
            }
            OpCode::JumpIfFalse => {
                if self.operand(&instr, 1)? == 0 {
                    return self.jump(&instr);
                }
                Step::Continue
            }
            OpCode::LessThan => {
                let value = self.operand(&instr, 1)? < self.operand(&instr, 2)?;
                self.store(&instr, 3, value as i64)?;
                Step::Continue
            }
            OpCode::Equals => {
                let value = self.operand(&instr, 1)? == self.operand(&instr, 2)?;
                self.store(&instr, 3, value as i64)?;
                Step::Continue
            }
            OpCode::AdjustBase => {
                self.cpu.relative_base = self
                    .cpu
                    .relative_base
                    .checked_add(self.operand(&instr, 1)?)
                    .ok_or(VmError::Overflow {
                        ip,
                        op: "relative base adjustment",
                    })?;
                Step::Continue
            }
            OpCode::Halt => {
                self.cpu.halt = true;
                self.status = Status::Halted;
                self.inputs.clear();
                debug!("halted: {}", self.cpu);
                return Ok(Step::Halted);
            }
        };

        self.cpu.ip += instr.opcode.width();
        Ok(step)
    }

    fn jump(&mut self, instr: &Instruction) -> Result<Step> {
        let target = self.operand(instr, 2)?;
        self.cpu.ip = usize::try_from(target).map_err(|_| VmError::AddressOutOfBounds {
            address: target,
            size: self.memory.len(),
        })?;
        Ok(Step::Continue)
    }

    /// Raw cell of the 1-based parameter `offset` of the current instruction.
    fn parameter(&self, offset: usize) -> Result<i64> {
        self.memory.read((self.cpu.ip + offset) as i64)
    }

    fn relative(&self, raw: i64) -> Result<i64> {
        self.cpu
            .relative_base
            .checked_add(raw)
            .ok_or(VmError::Overflow {
                ip: self.cpu.ip,
                op: "relative addressing",
            })
    }

    fn operand(&self, instr: &Instruction, offset: usize) -> Result<i64> {
        let raw = self.parameter(offset)?;
        match instr.mode(self.cpu.ip, offset)? {
            Mode::Position => self.memory.read(raw),
            Mode::Immediate => Ok(raw),
            Mode::Relative => self.memory.read(self.relative(raw)?),
        }
    }

    fn store_address(&self, instr: &Instruction, offset: usize) -> Result<i64> {
        let raw = self.parameter(offset)?;
        match instr.mode(self.cpu.ip, offset)? {
            Mode::Position => Ok(raw),
            Mode::Immediate => Err(VmError::ImmediateWrite { ip: self.cpu.ip }),
            Mode::Relative => self.relative(raw),
        }
    }

    fn store(&mut self, instr: &Instruction, offset: usize, value: i64) -> Result<()> {
        let address = self.store_address(instr, offset)?;
        self.memory.write(address, value)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn run_once(program: &str, inputs: &[i64]) -> Vec<i64> {
        Machine::new(program).unwrap().run(inputs).unwrap()
    }

    #[test]
    pub fn equality_position_mode() {
        init();
        let prog = "3,9,8,9,10,9,4,9,99,-1,8";
        assert_eq!(run_once(prog, &[8]), vec![1]);
        assert_eq!(run_once(prog, &[5]), vec![0]);
    }

    #[test]
    pub fn less_than_position_mode() {
        init();
        let prog = "3,9,7,9,10,9,4,9,99,-1,8";
        assert_eq!(run_once(prog, &[5]), vec![1]);
        assert_eq!(run_once(prog, &[9]), vec![0]);
    }

    #[test]
    pub fn immediate_mode_comparisons_match_position_mode() {
        init();
        let eq = "3,3,1108,-1,8,3,4,3,99";
        let lt = "3,3,1107,-1,8,3,4,3,99";
        for input in [3, 5, 7, 8, 9, 12] {
            assert_eq!(run_once(eq, &[input]), run_once("3,9,8,9,10,9,4,9,99,-1,8", &[input]));
            assert_eq!(run_once(lt, &[input]), run_once("3,9,7,9,10,9,4,9,99,-1,8", &[input]));
        }
    }

    #[test]
    pub fn jumps() {
        init();
        let immediate = "3,3,1105,-1,9,1101,0,0,12,4,12,99,1";
        assert_eq!(run_once(immediate, &[0]), vec![0]);
        assert_eq!(run_once(immediate, &[8]), vec![1]);

        let position = "3,12,6,12,15,1,13,14,13,4,13,99,-1,0,1,9";
        assert_eq!(run_once(position, &[0]), vec![0]);
        assert_eq!(run_once(position, &[8]), vec![1]);
    }

    #[test]
    pub fn compares_against_eight() {
        init();
        let prog = "3,21,1008,21,8,20,1005,20,22,107,8,21,20,1006,20,31,\
                    1106,0,36,98,0,0,1002,21,125,20,4,20,1105,1,46,104,\
                    999,1105,1,46,1101,1000,1,20,4,20,1105,1,46,98,99";
        assert_eq!(run_once(prog, &[5]), vec![999]);
        assert_eq!(run_once(prog, &[8]), vec![1000]);
        assert_eq!(run_once(prog, &[10]), vec![1001]);
    }

    #[test]
    pub fn large_values() {
        init();
        assert_eq!(
            run_once("1102,34915192,34915192,7,4,7,99,0", &[]),
            vec![1_219_070_632_396_864]
        );
        assert_eq!(
            run_once("104,1125899906842624,99", &[]),
            vec![1_125_899_906_842_624]
        );
    }

    #[test]
    pub fn quine() {
        init();
        let prog = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";
        let expected = Program::parse(prog).unwrap().data;
        let mut vm = Machine::new(prog).unwrap();
        assert_eq!(vm.run(&[]).unwrap(), expected);
        assert!(vm.halted());
    }

    #[test]
    pub fn suspends_without_advancing() {
        init();
        let mut vm = Machine::new("3,20,3,21,1,20,21,22,4,22,99").unwrap();

        assert_eq!(vm.run(&[]).unwrap(), Vec::<i64>::new());
        assert!(!vm.halted());
        assert_eq!(vm.status(), Status::SuspendedOnInput);
        assert_eq!(vm.cpu.ip, 0);

        assert_eq!(vm.run(&[4]).unwrap(), Vec::<i64>::new());
        assert_eq!(vm.cpu.ip, 2);

        assert_eq!(vm.run(&[5]).unwrap(), vec![9]);
        assert!(vm.halted());
    }

    #[test]
    pub fn resumption_matches_upfront_input_for_every_split() {
        init();
        // Outputs the running sum after each of three inputs.
        let prog = "3,30,4,30,3,31,1,30,31,30,4,30,3,31,1,30,31,30,4,30,99";
        let inputs = [2, 3, 4];
        let expected = run_once(prog, &inputs);
        assert_eq!(expected, vec![2, 5, 9]);

        for i in 0..=inputs.len() {
            for j in i..=inputs.len() {
                let mut vm = Machine::new(prog).unwrap();
                let mut outputs = vm.run(&inputs[..i]).unwrap();
                outputs.extend(vm.run(&inputs[i..j]).unwrap());
                outputs.extend(vm.run(&inputs[j..]).unwrap());
                assert_eq!(outputs, expected, "split at {} and {}", i, j);
                assert!(vm.halted());
            }
        }
    }

    #[test]
    pub fn halted_machine_stays_halted() {
        init();
        let mut vm = Machine::new("104,7,99").unwrap();
        assert_eq!(vm.run(&[]).unwrap(), vec![7]);
        assert!(vm.halted());
        assert_eq!(vm.run(&[1, 2]).unwrap(), Vec::<i64>::new());
        assert_eq!(vm.run_until_output(&[]).unwrap(), None);
        assert!(vm.halted());
        assert_eq!(vm.status(), Status::Halted);
    }

    #[test]
    pub fn pure_for_arithmetic_programs() {
        init();
        let prog = "1101,6,7,20,1002,20,3,20,4,20,99";
        assert_eq!(run_once(prog, &[]), vec![39]);
        assert_eq!(run_once(prog, &[]), run_once(prog, &[]));
    }

    #[test]
    pub fn stops_after_each_output() {
        init();
        let mut vm = Machine::new("104,1,104,2,99").unwrap();
        assert_eq!(vm.run_until_output(&[]).unwrap(), Some(1));
        assert_eq!(vm.status(), Status::Ready);
        assert_eq!(vm.run_until_output(&[]).unwrap(), Some(2));
        assert_eq!(vm.run_until_output(&[]).unwrap(), None);
        assert!(vm.halted());
    }

    #[test]
    pub fn unconsumed_input_carries_over() {
        init();
        let mut vm = Machine::new("3,20,4,20,3,20,4,20,99").unwrap();
        assert_eq!(vm.run_until_output(&[7, 8]).unwrap(), Some(7));
        assert_eq!(vm.run_until_output(&[]).unwrap(), Some(8));
        assert_eq!(vm.run(&[]).unwrap(), Vec::<i64>::new());
        assert!(vm.halted());
    }

    #[test]
    pub fn clones_run_independently() {
        init();
        // Doubles every input forever.
        let mut vm = Machine::new("3,20,1002,20,2,20,4,20,1105,1,0,99").unwrap();
        assert_eq!(vm.run(&[1]).unwrap(), vec![2]);

        let mut fork = vm.clone();
        assert_eq!(fork.run(&[5]).unwrap(), vec![10]);
        assert_eq!(vm.run(&[3, 4]).unwrap(), vec![6, 8]);
        assert_eq!(vm.status(), Status::SuspendedOnInput);
    }

    #[test]
    pub fn relative_mode_reads_and_writes() {
        init();
        // RB = 10; [RB + 2] = input; output [RB + 2].
        let mut vm = Machine::new("109,10,203,2,204,2,99").unwrap();
        assert_eq!(vm.run(&[-42]).unwrap(), vec![-42]);
    }

    #[test]
    pub fn custom_padding() {
        init();
        let program = Program::parse("1101,1,1,9,4,9,99").unwrap();
        let mut vm = Machine::with_padding(&program, 0).unwrap();
        assert!(matches!(
            vm.run(&[]),
            Err(VmError::AddressOutOfBounds { address: 9, size: 7 })
        ));

        let mut vm = Machine::with_padding(&program, 1).unwrap();
        assert_eq!(vm.run(&[]).unwrap(), vec![2]);
    }

    #[test]
    pub fn oversized_padding_fails_to_load() {
        init();
        let program = Program::parse("104,7,99").unwrap();
        assert!(matches!(
            Machine::with_padding(&program, usize::MAX),
            Err(VmError::MemoryTooLarge {
                program_len: 3,
                padding_factor: usize::MAX
            })
        ));
    }

    #[test]
    pub fn unknown_opcode_faults_the_machine() {
        init();
        let mut vm = Machine::new("42").unwrap();
        assert!(matches!(
            vm.run(&[]),
            Err(VmError::UnknownOpcode { ip: 0, word: 42 })
        ));
        assert_eq!(vm.status(), Status::Faulted);
        assert!(matches!(vm.run(&[]), Err(VmError::Faulted)));
    }

    #[test]
    pub fn immediate_mode_store_is_rejected() {
        init();
        assert!(matches!(
            Machine::new("11101,1,1,5,99").unwrap().run(&[]),
            Err(VmError::ImmediateWrite { ip: 0 })
        ));
        assert!(matches!(
            Machine::new("103,5,99").unwrap().run(&[1]),
            Err(VmError::ImmediateWrite { ip: 0 })
        ));
    }

    #[test]
    pub fn unknown_mode_is_rejected() {
        init();
        assert!(matches!(
            Machine::new("304,0,99").unwrap().run(&[]),
            Err(VmError::UnknownMode { ip: 0, mode: 3 })
        ));
    }

    #[test]
    pub fn out_of_bounds_access_is_rejected() {
        init();
        assert!(matches!(
            Machine::new("4,1000,99").unwrap().run(&[]),
            Err(VmError::AddressOutOfBounds { address: 1000, size: 33 })
        ));
        assert!(matches!(
            Machine::new("4,-1,99").unwrap().run(&[]),
            Err(VmError::AddressOutOfBounds { address: -1, .. })
        ));
        assert!(matches!(
            Machine::new("1105,1,-5").unwrap().run(&[]),
            Err(VmError::AddressOutOfBounds { address: -5, .. })
        ));
    }

    #[test]
    pub fn overflow_is_rejected() {
        init();
        assert!(matches!(
            Machine::new("1101,9223372036854775807,1,5,99").unwrap().run(&[]),
            Err(VmError::Overflow { ip: 0, op: "add" })
        ));
        assert!(matches!(
            Machine::new("1102,4611686018427387904,2,5,99").unwrap().run(&[]),
            Err(VmError::Overflow { ip: 0, op: "multiply" })
        ));
        assert!(matches!(
            Machine::new("109,9223372036854775807,109,1,99").unwrap().run(&[]),
            Err(VmError::Overflow {
                ip: 2,
                op: "relative base adjustment"
            })
        ));
        assert!(matches!(
            Machine::new("109,9223372036854775807,204,1,99").unwrap().run(&[]),
            Err(VmError::Overflow {
                ip: 2,
                op: "relative addressing"
            })
        ));
    }
}
