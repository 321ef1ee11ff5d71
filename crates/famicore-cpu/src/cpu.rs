//! 6502 CPU core.
//!
//! Per-instruction execution: [`Cpu::step`] fetches, decodes through the
//! static opcode table, executes, and reports the cycle cost so the driver
//! can advance the PPU in lockstep. Interrupt entry (RESET, NMI, IRQ) is
//! exposed as explicit methods the driver calls between instructions.

use crate::CpuError;
use crate::addressing::AddrMode;
use crate::bus::Bus;
use crate::opcodes::OPCODE_TABLE;
use crate::status::Status;
use crate::vectors;

/// Base of the hardware stack page.
const STACK_BASE: u16 = 0x0100;

/// A resolved operand location.
struct Resolved {
    addr: u16,
    /// Indexing stepped over a page boundary (read penalties only).
    crossed: bool,
}

/// MOS 6502 CPU (NES 2A03 variant: decimal mode stored but ignored).
#[derive(Debug, Clone)]
pub struct Cpu {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer into page 1.
    pub sp: u8,
    /// Program counter.
    pub pc: u16,
    /// Status flags.
    pub status: Status,
    /// Total cycles executed since power-on.
    pub cycles: u64,
    /// Sticky halt cause; every later `step` returns it again.
    halted: Option<CpuError>,
}

impl Cpu {
    /// A CPU in power-on state. Call [`Cpu::reset`] before stepping.
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: Status::POWER_ON,
            cycles: 0,
            halted: None,
        }
    }

    /// RESET: load PC from `$FFFC/$FFFD`, SP to `$FD`, flags to I|U,
    /// clear the registers and any halt condition.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = Status::POWER_ON;
        self.pc = bus.read_word(vectors::RESET);
        self.halted = None;
        self.cycles += 7;
    }

    /// Non-maskable interrupt entry. Returns the 7-cycle cost.
    pub fn nmi(&mut self, bus: &mut impl Bus) -> u8 {
        self.push_word(bus, self.pc);
        self.push(bus, self.status.to_stack_byte(false));
        self.status.insert(Status::I);
        self.pc = bus.read_word(vectors::NMI);
        self.cycles += 7;
        7
    }

    /// Maskable interrupt entry. Suppressed (returns 0) while the I flag is
    /// set; otherwise returns the 7-cycle cost.
    pub fn irq(&mut self, bus: &mut impl Bus) -> u8 {
        if self.status.contains(Status::I) {
            return 0;
        }
        self.push_word(bus, self.pc);
        self.push(bus, self.status.to_stack_byte(false));
        self.status.insert(Status::I);
        self.pc = bus.read_word(vectors::IRQ);
        self.cycles += 7;
        7
    }

    /// Whether a KIL or unimplemented opcode has halted the CPU.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Execute one instruction and return its cycle cost.
    ///
    /// # Errors
    ///
    /// [`CpuError::Jam`] for the KIL family, [`CpuError::IllegalOpcode`] for
    /// opcodes outside the implemented set. The halt is sticky: once an
    /// error is returned, every later call returns the same error until
    /// [`Cpu::reset`].
    pub fn step(&mut self, bus: &mut impl Bus) -> Result<u8, CpuError> {
        if let Some(err) = &self.halted {
            return Err(err.clone());
        }

        let pc = self.pc;
        let opcode = bus.read(pc);
        self.pc = self.pc.wrapping_add(1);
        let info = &OPCODE_TABLE[usize::from(opcode)];

        let extra = match self.execute(opcode, info.mode, bus) {
            Ok(extra) => extra,
            Err(err) => {
                log::error!("CPU halted: {err}");
                self.pc = pc;
                self.halted = Some(err.clone());
                return Err(err);
            }
        };

        let cost = info.cycles + extra;
        self.cycles += u64::from(cost);
        Ok(cost)
    }

    // ------------------------------------------------------------------
    // Operand resolution
    // ------------------------------------------------------------------

    /// Consume the operand bytes at PC and compute the effective address.
    fn resolve(&mut self, bus: &mut impl Bus, mode: AddrMode) -> Resolved {
        match mode {
            AddrMode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                Resolved {
                    addr,
                    crossed: false,
                }
            }
            AddrMode::ZeroPage => {
                let addr = u16::from(bus.read(self.pc));
                self.pc = self.pc.wrapping_add(1);
                Resolved {
                    addr,
                    crossed: false,
                }
            }
            AddrMode::ZeroPageX => {
                let zp = bus.read(self.pc).wrapping_add(self.x);
                self.pc = self.pc.wrapping_add(1);
                Resolved {
                    addr: u16::from(zp),
                    crossed: false,
                }
            }
            AddrMode::ZeroPageY => {
                let zp = bus.read(self.pc).wrapping_add(self.y);
                self.pc = self.pc.wrapping_add(1);
                Resolved {
                    addr: u16::from(zp),
                    crossed: false,
                }
            }
            AddrMode::Absolute => {
                let addr = bus.read_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                Resolved {
                    addr,
                    crossed: false,
                }
            }
            AddrMode::AbsoluteX => {
                let base = bus.read_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                let addr = base.wrapping_add(u16::from(self.x));
                Resolved {
                    addr,
                    crossed: page_of(base) != page_of(addr),
                }
            }
            AddrMode::AbsoluteY => {
                let base = bus.read_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                let addr = base.wrapping_add(u16::from(self.y));
                Resolved {
                    addr,
                    crossed: page_of(base) != page_of(addr),
                }
            }
            AddrMode::Indirect => {
                let ptr = bus.read_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                Resolved {
                    addr: bus.read_word_wrapped(ptr),
                    crossed: false,
                }
            }
            AddrMode::IndirectX => {
                let ptr = bus.read(self.pc).wrapping_add(self.x);
                self.pc = self.pc.wrapping_add(1);
                let lo = bus.read(u16::from(ptr));
                let hi = bus.read(u16::from(ptr.wrapping_add(1)));
                Resolved {
                    addr: u16::from_le_bytes([lo, hi]),
                    crossed: false,
                }
            }
            AddrMode::IndirectY => {
                let ptr = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let lo = bus.read(u16::from(ptr));
                let hi = bus.read(u16::from(ptr.wrapping_add(1)));
                let base = u16::from_le_bytes([lo, hi]);
                let addr = base.wrapping_add(u16::from(self.y));
                Resolved {
                    addr,
                    crossed: page_of(base) != page_of(addr),
                }
            }
            AddrMode::Implied | AddrMode::Accumulator | AddrMode::Relative => {
                unreachable!("mode {mode:?} has no operand address")
            }
        }
    }

    /// Read the operand value. Returns the page-cross flag for read-penalty
    /// accounting.
    fn fetch(&mut self, bus: &mut impl Bus, mode: AddrMode) -> (u8, bool) {
        if mode == AddrMode::Accumulator {
            return (self.a, false);
        }
        let resolved = self.resolve(bus, mode);
        (bus.read(resolved.addr), resolved.crossed)
    }

    // ------------------------------------------------------------------
    // Stack
    // ------------------------------------------------------------------

    pub(crate) fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(STACK_BASE | u16::from(self.sp), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(STACK_BASE | u16::from(self.sp))
    }

    pub(crate) fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, (value & 0xFF) as u8);
    }

    pub(crate) fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.pull(bus);
        let hi = self.pull(bus);
        u16::from_le_bytes([lo, hi])
    }

    #[inline]
    fn set_zn(&mut self, value: u8) {
        self.status.set_zn(value);
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn execute(
        &mut self,
        opcode: u8,
        mode: AddrMode,
        bus: &mut impl Bus,
    ) -> Result<u8, CpuError> {
        let extra = match opcode {
            // Loads
            0xA9 | 0xA5 | 0xB5 | 0xAD | 0xBD | 0xB9 | 0xA1 | 0xB1 => self.lda(bus, mode),
            0xA2 | 0xA6 | 0xB6 | 0xAE | 0xBE => self.ldx(bus, mode),
            0xA0 | 0xA4 | 0xB4 | 0xAC | 0xBC => self.ldy(bus, mode),

            // Stores
            0x85 | 0x95 | 0x8D | 0x9D | 0x99 | 0x81 | 0x91 => self.store(bus, mode, self.a),
            0x86 | 0x96 | 0x8E => self.store(bus, mode, self.x),
            0x84 | 0x94 | 0x8C => self.store(bus, mode, self.y),

            // Transfers
            0xAA => {
                self.x = self.a;
                self.set_zn(self.x);
                0
            }
            0xA8 => {
                self.y = self.a;
                self.set_zn(self.y);
                0
            }
            0x8A => {
                self.a = self.x;
                self.set_zn(self.a);
                0
            }
            0x98 => {
                self.a = self.y;
                self.set_zn(self.a);
                0
            }
            0xBA => {
                self.x = self.sp;
                self.set_zn(self.x);
                0
            }
            0x9A => {
                self.sp = self.x;
                0
            }

            // Stack
            0x48 => {
                self.push(bus, self.a);
                0
            }
            0x08 => {
                let byte = self.status.to_stack_byte(true);
                self.push(bus, byte);
                0
            }
            0x68 => {
                self.a = self.pull(bus);
                self.set_zn(self.a);
                0
            }
            0x28 => {
                let byte = self.pull(bus);
                self.status = Status::from_stack_byte(byte);
                0
            }

            // Arithmetic
            0x69 | 0x65 | 0x75 | 0x6D | 0x7D | 0x79 | 0x61 | 0x71 => {
                let (value, crossed) = self.fetch(bus, mode);
                self.adc(value);
                u8::from(crossed)
            }
            0xE9 | 0xE5 | 0xF5 | 0xED | 0xFD | 0xF9 | 0xE1 | 0xF1 | 0xEB => {
                let (value, crossed) = self.fetch(bus, mode);
                self.adc(!value);
                u8::from(crossed)
            }

            // Logic
            0x29 | 0x25 | 0x35 | 0x2D | 0x3D | 0x39 | 0x21 | 0x31 => {
                let (value, crossed) = self.fetch(bus, mode);
                self.a &= value;
                self.set_zn(self.a);
                u8::from(crossed)
            }
            0x09 | 0x05 | 0x15 | 0x0D | 0x1D | 0x19 | 0x01 | 0x11 => {
                let (value, crossed) = self.fetch(bus, mode);
                self.a |= value;
                self.set_zn(self.a);
                u8::from(crossed)
            }
            0x49 | 0x45 | 0x55 | 0x4D | 0x5D | 0x59 | 0x41 | 0x51 => {
                let (value, crossed) = self.fetch(bus, mode);
                self.a ^= value;
                self.set_zn(self.a);
                u8::from(crossed)
            }
            0x24 | 0x2C => {
                let (value, _) = self.fetch(bus, mode);
                self.status.set(Status::Z, self.a & value == 0);
                self.status.set(Status::V, value & 0x40 != 0);
                self.status.set(Status::N, value & 0x80 != 0);
                0
            }

            // Compares
            0xC9 | 0xC5 | 0xD5 | 0xCD | 0xDD | 0xD9 | 0xC1 | 0xD1 => {
                let (value, crossed) = self.fetch(bus, mode);
                self.compare(self.a, value);
                u8::from(crossed)
            }
            0xE0 | 0xE4 | 0xEC => {
                let (value, _) = self.fetch(bus, mode);
                self.compare(self.x, value);
                0
            }
            0xC0 | 0xC4 | 0xCC => {
                let (value, _) = self.fetch(bus, mode);
                self.compare(self.y, value);
                0
            }

            // Shifts and rotates
            0x0A => {
                self.a = self.asl_value(self.a);
                0
            }
            0x06 | 0x16 | 0x0E | 0x1E => self.rmw(bus, mode, Self::asl_value),
            0x4A => {
                self.a = self.lsr_value(self.a);
                0
            }
            0x46 | 0x56 | 0x4E | 0x5E => self.rmw(bus, mode, Self::lsr_value),
            0x2A => {
                self.a = self.rol_value(self.a);
                0
            }
            0x26 | 0x36 | 0x2E | 0x3E => self.rmw(bus, mode, Self::rol_value),
            0x6A => {
                self.a = self.ror_value(self.a);
                0
            }
            0x66 | 0x76 | 0x6E | 0x7E => self.rmw(bus, mode, Self::ror_value),

            // Memory increments/decrements
            0xE6 | 0xF6 | 0xEE | 0xFE => self.rmw(bus, mode, |cpu, v| {
                let result = v.wrapping_add(1);
                cpu.set_zn(result);
                result
            }),
            0xC6 | 0xD6 | 0xCE | 0xDE => self.rmw(bus, mode, |cpu, v| {
                let result = v.wrapping_sub(1);
                cpu.set_zn(result);
                result
            }),

            // Register increments/decrements
            0xE8 => {
                self.x = self.x.wrapping_add(1);
                self.set_zn(self.x);
                0
            }
            0xC8 => {
                self.y = self.y.wrapping_add(1);
                self.set_zn(self.y);
                0
            }
            0xCA => {
                self.x = self.x.wrapping_sub(1);
                self.set_zn(self.x);
                0
            }
            0x88 => {
                self.y = self.y.wrapping_sub(1);
                self.set_zn(self.y);
                0
            }

            // Branches
            0x10 => self.branch(bus, !self.status.contains(Status::N)),
            0x30 => self.branch(bus, self.status.contains(Status::N)),
            0x50 => self.branch(bus, !self.status.contains(Status::V)),
            0x70 => self.branch(bus, self.status.contains(Status::V)),
            0x90 => self.branch(bus, !self.status.contains(Status::C)),
            0xB0 => self.branch(bus, self.status.contains(Status::C)),
            0xD0 => self.branch(bus, !self.status.contains(Status::Z)),
            0xF0 => self.branch(bus, self.status.contains(Status::Z)),

            // Jumps and returns
            0x4C | 0x6C => {
                let resolved = self.resolve(bus, mode);
                self.pc = resolved.addr;
                0
            }
            0x20 => {
                let target = bus.read_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = target;
                0
            }
            0x60 => {
                self.pc = self.pull_word(bus).wrapping_add(1);
                0
            }
            0x40 => {
                let byte = self.pull(bus);
                self.status = Status::from_stack_byte(byte);
                self.pc = self.pull_word(bus);
                0
            }
            0x00 => {
                // The byte after BRK is a signature byte the return address
                // skips over.
                self.pc = self.pc.wrapping_add(1);
                self.push_word(bus, self.pc);
                let byte = self.status.to_stack_byte(true);
                self.push(bus, byte);
                self.status.insert(Status::I);
                self.pc = bus.read_word(vectors::IRQ);
                0
            }

            // Flags
            0x18 => {
                self.status.remove(Status::C);
                0
            }
            0x38 => {
                self.status.insert(Status::C);
                0
            }
            0x58 => {
                self.status.remove(Status::I);
                0
            }
            0x78 => {
                self.status.insert(Status::I);
                0
            }
            0xB8 => {
                self.status.remove(Status::V);
                0
            }
            0xD8 => {
                self.status.remove(Status::D);
                0
            }
            0xF8 => {
                self.status.insert(Status::D);
                0
            }

            // Official and unofficial NOPs: consume the operand, nothing else.
            0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => 0,
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 | 0x04 | 0x44 | 0x64 | 0x14 | 0x34 | 0x54 | 0x74
            | 0xD4 | 0xF4 | 0x0C | 0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => {
                let resolved = self.resolve(bus, mode);
                u8::from(resolved.crossed)
            }

            // Stable undocumented opcodes
            0x07 | 0x17 | 0x0F | 0x1F | 0x1B | 0x03 | 0x13 => {
                // SLO: ASL memory, then ORA the result into A.
                self.rmw(bus, mode, |cpu, v| {
                    cpu.status.set(Status::C, v & 0x80 != 0);
                    let result = v << 1;
                    cpu.a |= result;
                    cpu.set_zn(cpu.a);
                    result
                })
            }
            0x27 | 0x37 | 0x2F | 0x3F | 0x3B | 0x23 | 0x33 => {
                // RLA: ROL memory, then AND.
                self.rmw(bus, mode, |cpu, v| {
                    let result = (v << 1) | u8::from(cpu.status.contains(Status::C));
                    cpu.status.set(Status::C, v & 0x80 != 0);
                    cpu.a &= result;
                    cpu.set_zn(cpu.a);
                    result
                })
            }
            0x47 | 0x57 | 0x4F | 0x5F | 0x5B | 0x43 | 0x53 => {
                // SRE: LSR memory, then EOR.
                self.rmw(bus, mode, |cpu, v| {
                    cpu.status.set(Status::C, v & 0x01 != 0);
                    let result = v >> 1;
                    cpu.a ^= result;
                    cpu.set_zn(cpu.a);
                    result
                })
            }
            0x67 | 0x77 | 0x6F | 0x7F | 0x7B | 0x63 | 0x73 => {
                // RRA: ROR memory, then ADC.
                self.rmw(bus, mode, |cpu, v| {
                    let result = (v >> 1) | (u8::from(cpu.status.contains(Status::C)) << 7);
                    cpu.status.set(Status::C, v & 0x01 != 0);
                    cpu.adc(result);
                    result
                })
            }
            0xC7 | 0xD7 | 0xCF | 0xDF | 0xDB | 0xC3 | 0xD3 => {
                // DCP: DEC memory, then CMP.
                self.rmw(bus, mode, |cpu, v| {
                    let result = v.wrapping_sub(1);
                    cpu.compare(cpu.a, result);
                    result
                })
            }
            0xE7 | 0xF7 | 0xEF | 0xFF | 0xFB | 0xE3 | 0xF3 => {
                // ISC: INC memory, then SBC.
                self.rmw(bus, mode, |cpu, v| {
                    let result = v.wrapping_add(1);
                    cpu.adc(!result);
                    result
                })
            }
            0xA7 | 0xB7 | 0xAF | 0xBF | 0xA3 | 0xB3 => {
                // LAX: LDA + LDX in one.
                let (value, crossed) = self.fetch(bus, mode);
                self.a = value;
                self.x = value;
                self.set_zn(value);
                u8::from(crossed)
            }
            0x87 | 0x97 | 0x8F | 0x83 => self.store(bus, mode, self.a & self.x),

            // KIL family: the CPU wedges.
            0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2
            | 0xF2 => {
                return Err(CpuError::Jam {
                    opcode,
                    pc: self.pc.wrapping_sub(1),
                });
            }

            // Unstable undocumented group: refuse rather than guess.
            _ => {
                return Err(CpuError::IllegalOpcode {
                    opcode,
                    pc: self.pc.wrapping_sub(1),
                });
            }
        };
        Ok(extra)
    }

    // ------------------------------------------------------------------
    // Instruction helpers
    // ------------------------------------------------------------------

    fn lda(&mut self, bus: &mut impl Bus, mode: AddrMode) -> u8 {
        let (value, crossed) = self.fetch(bus, mode);
        self.a = value;
        self.set_zn(self.a);
        u8::from(crossed)
    }

    fn ldx(&mut self, bus: &mut impl Bus, mode: AddrMode) -> u8 {
        let (value, crossed) = self.fetch(bus, mode);
        self.x = value;
        self.set_zn(self.x);
        u8::from(crossed)
    }

    fn ldy(&mut self, bus: &mut impl Bus, mode: AddrMode) -> u8 {
        let (value, crossed) = self.fetch(bus, mode);
        self.y = value;
        self.set_zn(self.y);
        u8::from(crossed)
    }

    /// Stores never take the page-cross penalty; the base cost covers the
    /// fix-up cycle.
    fn store(&mut self, bus: &mut impl Bus, mode: AddrMode, value: u8) -> u8 {
        let resolved = self.resolve(bus, mode);
        bus.write(resolved.addr, value);
        0
    }

    /// Read-modify-write on memory through `f`; base cost covers the
    /// dummy-write cycle.
    fn rmw(&mut self, bus: &mut impl Bus, mode: AddrMode, f: fn(&mut Self, u8) -> u8) -> u8 {
        let resolved = self.resolve(bus, mode);
        let value = bus.read(resolved.addr);
        let result = f(self, value);
        bus.write(resolved.addr, result);
        0
    }

    fn adc(&mut self, value: u8) {
        let carry = u16::from(self.status.contains(Status::C));
        let sum = u16::from(self.a) + u16::from(value) + carry;
        let result = sum as u8;

        self.status.set(Status::C, sum > 0xFF);
        self.status
            .set(Status::V, (!(self.a ^ value) & (self.a ^ result)) & 0x80 != 0);
        self.a = result;
        self.set_zn(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.status.set(Status::C, register >= value);
        self.set_zn(register.wrapping_sub(value));
    }

    fn asl_value(&mut self, value: u8) -> u8 {
        self.status.set(Status::C, value & 0x80 != 0);
        let result = value << 1;
        self.set_zn(result);
        result
    }

    fn lsr_value(&mut self, value: u8) -> u8 {
        self.status.set(Status::C, value & 0x01 != 0);
        let result = value >> 1;
        self.set_zn(result);
        result
    }

    fn rol_value(&mut self, value: u8) -> u8 {
        let result = (value << 1) | u8::from(self.status.contains(Status::C));
        self.status.set(Status::C, value & 0x80 != 0);
        self.set_zn(result);
        result
    }

    fn ror_value(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | (u8::from(self.status.contains(Status::C)) << 7);
        self.status.set(Status::C, value & 0x01 != 0);
        self.set_zn(result);
        result
    }

    /// Branch on `cond`. The displacement is relative to the byte after the
    /// operand. Extra cycles: +1 taken, +1 more on page cross.
    fn branch(&mut self, bus: &mut impl Bus, cond: bool) -> u8 {
        let offset = bus.read(self.pc) as i8;
        self.pc = self.pc.wrapping_add(1);
        if !cond {
            return 0;
        }
        let target = self.pc.wrapping_add(offset as u16);
        let extra = if page_of(target) == page_of(self.pc) {
            1
        } else {
            2
        };
        self.pc = target;
        extra
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
const fn page_of(addr: u16) -> u16 {
    addr & 0xFF00
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatRam {
        bytes: Vec<u8>,
    }

    impl FlatRam {
        fn new() -> Self {
            Self {
                bytes: vec![0; 0x10000],
            }
        }

        /// Load a program at `$8000` and point the reset vector at it.
        fn with_program(program: &[u8]) -> (Self, Cpu) {
            let mut ram = Self::new();
            ram.bytes[0x8000..0x8000 + program.len()].copy_from_slice(program);
            ram.bytes[0xFFFC] = 0x00;
            ram.bytes[0xFFFD] = 0x80;
            let mut cpu = Cpu::new();
            cpu.reset(&mut ram);
            (ram, cpu)
        }
    }

    impl Bus for FlatRam {
        fn read(&mut self, addr: u16) -> u8 {
            self.bytes[usize::from(addr)]
        }

        fn write(&mut self, addr: u16, value: u8) {
            self.bytes[usize::from(addr)] = value;
        }
    }

    #[test]
    fn test_reset_state() {
        let (_, cpu) = FlatRam::with_program(&[0xEA]);
        assert_eq!(cpu.pc, 0x8000);
        assert_eq!(cpu.sp, 0xFD);
        assert_eq!(cpu.a, 0);
        assert!(cpu.status.contains(Status::I));
        assert!(cpu.status.contains(Status::U));
    }

    #[test]
    fn test_lda_immediate_flags() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA9, 0x00, 0xA9, 0x80, 0xA9, 0x42]);
        cpu.step(&mut ram).unwrap();
        assert!(cpu.status.contains(Status::Z));
        cpu.step(&mut ram).unwrap();
        assert!(cpu.status.contains(Status::N));
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.a, 0x42);
        assert!(!cpu.status.intersects(Status::Z | Status::N));
    }

    #[test]
    fn test_adc_carry_and_overflow() {
        // 0x50 + 0x50 = 0xA0: signed overflow, no carry.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA9, 0x50, 0x69, 0x50]);
        cpu.step(&mut ram).unwrap();
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.a, 0xA0);
        assert!(cpu.status.contains(Status::V));
        assert!(!cpu.status.contains(Status::C));
        assert!(cpu.status.contains(Status::N));

        // 0xFF + 0x01 = 0x00: carry out, no signed overflow.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA9, 0xFF, 0x69, 0x01]);
        cpu.step(&mut ram).unwrap();
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.a, 0x00);
        assert!(cpu.status.contains(Status::C));
        assert!(cpu.status.contains(Status::Z));
        assert!(!cpu.status.contains(Status::V));
    }

    #[test]
    fn test_sbc_is_adc_of_complement() {
        // SEC; LDA #$50; SBC #$10 -> 0x40
        let (mut ram, mut cpu) = FlatRam::with_program(&[0x38, 0xA9, 0x50, 0xE9, 0x10]);
        for _ in 0..3 {
            cpu.step(&mut ram).unwrap();
        }
        assert_eq!(cpu.a, 0x40);
        assert!(cpu.status.contains(Status::C)); // no borrow
    }

    #[test]
    fn test_compare_sets_carry_on_greater_equal() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA9, 0x40, 0xC9, 0x30, 0xC9, 0x40, 0xC9, 0x50]);
        cpu.step(&mut ram).unwrap();
        cpu.step(&mut ram).unwrap();
        assert!(cpu.status.contains(Status::C));
        assert!(!cpu.status.contains(Status::Z));
        cpu.step(&mut ram).unwrap();
        assert!(cpu.status.contains(Status::C));
        assert!(cpu.status.contains(Status::Z));
        cpu.step(&mut ram).unwrap();
        assert!(!cpu.status.contains(Status::C));
        assert!(cpu.status.contains(Status::N));
    }

    #[test]
    fn test_bit_copies_high_bits() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA9, 0x01, 0x24, 0x10]);
        ram.bytes[0x10] = 0xC0; // N and V source bits set, no overlap with A
        cpu.step(&mut ram).unwrap();
        cpu.step(&mut ram).unwrap();
        assert!(cpu.status.contains(Status::Z));
        assert!(cpu.status.contains(Status::N));
        assert!(cpu.status.contains(Status::V));
    }

    #[test]
    fn test_zero_page_x_wraps() {
        // LDX #$10; LDA $F8,X -> reads $08, not $108.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA2, 0x10, 0xB5, 0xF8]);
        ram.bytes[0x08] = 0x7E;
        ram.bytes[0x108] = 0x11;
        cpu.step(&mut ram).unwrap();
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.a, 0x7E);
    }

    #[test]
    fn test_indirect_y_resolution() {
        // LDY #$04; LDA ($20),Y with ($20) = $1230 -> reads $1234.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA0, 0x04, 0xB1, 0x20]);
        ram.bytes[0x20] = 0x30;
        ram.bytes[0x21] = 0x12;
        ram.bytes[0x1234] = 0x99;
        cpu.step(&mut ram).unwrap();
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.a, 0x99);
    }

    #[test]
    fn test_page_cross_penalty_on_indexed_read() {
        // LDX #$01; LDA $12FF,X crosses into $1300: 4 + 1 cycles.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA2, 0x01, 0xBD, 0xFF, 0x12]);
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.step(&mut ram).unwrap(), 5);

        // No cross: 4 cycles.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA2, 0x01, 0xBD, 0x00, 0x12]);
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.step(&mut ram).unwrap(), 4);
    }

    #[test]
    fn test_store_has_no_page_cross_penalty() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA2, 0x01, 0xA9, 0x77, 0x9D, 0xFF, 0x12]);
        cpu.step(&mut ram).unwrap();
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.step(&mut ram).unwrap(), 5);
        assert_eq!(ram.bytes[0x1300], 0x77);
    }

    #[test]
    fn test_branch_cycle_costs() {
        // BNE not taken: 2 cycles.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA9, 0x00, 0xD0, 0x10]);
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.step(&mut ram).unwrap(), 2);

        // BEQ taken, same page: 3 cycles.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA9, 0x00, 0xF0, 0x10]);
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.step(&mut ram).unwrap(), 3);
        assert_eq!(cpu.pc, 0x8014);

        // BEQ taken, crossing back a page: 4 cycles.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA9, 0x00, 0xF0, 0x80]);
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.step(&mut ram).unwrap(), 4);
        assert_eq!(cpu.pc, 0x7F84);
    }

    #[test]
    fn test_jmp_indirect_page_wrap_bug() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0x6C, 0xFF, 0x02]);
        ram.bytes[0x02FF] = 0x34;
        ram.bytes[0x0300] = 0x56; // correct high byte, never read
        ram.bytes[0x0200] = 0x12; // buggy high byte
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.pc, 0x1234);
    }

    #[test]
    fn test_jsr_rts_round_trip() {
        // JSR $8010; (at $8010) RTS -> back to $8003.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0x20, 0x10, 0x80]);
        ram.bytes[0x8010] = 0x60;
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.pc, 0x8010);
        // Return address on the stack is the last byte of the JSR.
        assert_eq!(ram.bytes[0x01FD], 0x80);
        assert_eq!(ram.bytes[0x01FC], 0x02);
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.pc, 0x8003);
        assert_eq!(cpu.sp, 0xFD);
    }

    #[test]
    fn test_brk_pushes_and_vectors() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0x00]);
        ram.bytes[0xFFFE] = 0x00;
        ram.bytes[0xFFFF] = 0x90;
        let cost = cpu.step(&mut ram).unwrap();
        assert_eq!(cost, 7);
        assert_eq!(cpu.pc, 0x9000);
        assert!(cpu.status.contains(Status::I));
        // Pushed return address skips the signature byte.
        assert_eq!(ram.bytes[0x01FD], 0x80);
        assert_eq!(ram.bytes[0x01FC], 0x02);
        // Pushed status has B and U set.
        let pushed = ram.bytes[0x01FB];
        assert_ne!(pushed & Status::B.bits(), 0);
        assert_ne!(pushed & Status::U.bits(), 0);
    }

    #[test]
    fn test_rti_restores_flags_and_pc() {
        // BRK into a handler that immediately RTIs.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0x00, 0xEA, 0xEA]);
        ram.bytes[0xFFFE] = 0x00;
        ram.bytes[0xFFFF] = 0x90;
        ram.bytes[0x9000] = 0x40; // RTI
        cpu.step(&mut ram).unwrap();
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.pc, 0x8002); // past the signature byte
        assert!(!cpu.status.contains(Status::B));
        assert!(cpu.status.contains(Status::U));
    }

    #[test]
    fn test_nmi_entry() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xEA]);
        ram.bytes[0xFFFA] = 0x00;
        ram.bytes[0xFFFB] = 0xA0;
        let cost = cpu.nmi(&mut ram);
        assert_eq!(cost, 7);
        assert_eq!(cpu.pc, 0xA000);
        assert!(cpu.status.contains(Status::I));
        // B clear in the pushed copy.
        assert_eq!(ram.bytes[0x01FB] & Status::B.bits(), 0);
    }

    #[test]
    fn test_irq_suppressed_by_interrupt_disable() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xEA]);
        ram.bytes[0xFFFE] = 0x00;
        ram.bytes[0xFFFF] = 0xA0;
        assert!(cpu.status.contains(Status::I));
        assert_eq!(cpu.irq(&mut ram), 0);
        assert_eq!(cpu.pc, 0x8000);

        cpu.status.remove(Status::I);
        assert_eq!(cpu.irq(&mut ram), 7);
        assert_eq!(cpu.pc, 0xA000);
    }

    #[test]
    fn test_stack_wrap() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xEA]);
        cpu.sp = 0x00;
        cpu.push(&mut ram, 0x42);
        assert_eq!(ram.bytes[0x0100], 0x42);
        assert_eq!(cpu.sp, 0xFF);
        assert_eq!(cpu.pull(&mut ram), 0x42);
        assert_eq!(cpu.sp, 0x00);
    }

    #[test]
    fn test_rmw_inc_sets_flags_from_stored_value() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xE6, 0x10]);
        ram.bytes[0x10] = 0xFF;
        cpu.step(&mut ram).unwrap();
        assert_eq!(ram.bytes[0x10], 0x00);
        assert!(cpu.status.contains(Status::Z));
    }

    #[test]
    fn test_slo_shifts_and_ors() {
        // LDA #$01; SLO $10 with $10 = $81.
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA9, 0x01, 0x07, 0x10]);
        ram.bytes[0x10] = 0x81;
        cpu.step(&mut ram).unwrap();
        let cost = cpu.step(&mut ram).unwrap();
        assert_eq!(cost, 5);
        assert_eq!(ram.bytes[0x10], 0x02);
        assert_eq!(cpu.a, 0x03);
        assert!(cpu.status.contains(Status::C)); // from the pre-shift top bit
        assert!(!cpu.status.intersects(Status::Z | Status::N));
    }

    #[test]
    fn test_lax_loads_both_registers() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0xA7, 0x10]);
        ram.bytes[0x10] = 0x5A;
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.a, 0x5A);
        assert_eq!(cpu.x, 0x5A);
    }

    #[test]
    fn test_unofficial_nops_advance_pc_only() {
        // NOP zp; NOP abs,x; NOP imm; then LDA #$55.
        let (mut ram, mut cpu) =
            FlatRam::with_program(&[0x44, 0x10, 0x1C, 0x00, 0x20, 0x89, 0x07, 0xA9, 0x55]);
        ram.bytes[0x10] = 0x33;
        assert_eq!(cpu.step(&mut ram).unwrap(), 3);
        assert_eq!(cpu.step(&mut ram).unwrap(), 4);
        assert_eq!(cpu.step(&mut ram).unwrap(), 2);
        cpu.step(&mut ram).unwrap();
        assert_eq!(cpu.a, 0x55);
        assert_eq!(ram.bytes[0x10], 0x33); // untouched
    }

    #[test]
    fn test_kil_halts_sticky() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0x02]);
        let err = cpu.step(&mut ram).unwrap_err();
        assert_eq!(
            err,
            CpuError::Jam {
                opcode: 0x02,
                pc: 0x8000
            }
        );
        assert!(cpu.is_halted());
        assert_eq!(cpu.step(&mut ram).unwrap_err(), err);
    }

    #[test]
    fn test_unstable_opcode_halts() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0x8B, 0x00]);
        let err = cpu.step(&mut ram).unwrap_err();
        assert!(matches!(err, CpuError::IllegalOpcode { opcode: 0x8B, .. }));
    }

    #[test]
    fn test_reset_clears_halt() {
        let (mut ram, mut cpu) = FlatRam::with_program(&[0x02]);
        cpu.step(&mut ram).unwrap_err();
        cpu.reset(&mut ram);
        assert!(!cpu.is_halted());
        ram.bytes[0x8000] = 0xEA;
        assert_eq!(cpu.step(&mut ram).unwrap(), 2);
    }
}
