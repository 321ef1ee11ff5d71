//! Static opcode table.
//!
//! One entry per opcode byte: mnemonic (for diagnostics), addressing mode,
//! and base cycle cost. Page-cross and branch penalties are reported by the
//! execution handlers on top of the base cost; stores and read-modify-write
//! instructions already include the fixed extra cycle in their base cost.
//!
//! Opcodes the core refuses to execute still have entries so the table stays
//! total: `KIL` for the jam family, `???` for the unstable undocumented
//! group. Both halt the CPU with an error when fetched.

use crate::addressing::AddrMode;
use crate::addressing::AddrMode::{
    Absolute as Abs, AbsoluteX as Abx, AbsoluteY as Aby, Accumulator as Acc, Immediate as Imm,
    Implied as Imp, Indirect as Ind, IndirectX as Izx, IndirectY as Izy, Relative as Rel,
    ZeroPage as Zp0, ZeroPageX as Zpx, ZeroPageY as Zpy,
};

/// One row of the opcode table.
#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    /// Mnemonic, for error messages and traces.
    pub mnemonic: &'static str,
    /// Addressing mode.
    pub mode: AddrMode,
    /// Base cycle cost.
    pub cycles: u8,
}

const fn op(mnemonic: &'static str, mode: AddrMode, cycles: u8) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        cycles,
    }
}

/// Complete 256-entry opcode lookup table, indexed by opcode byte.
#[rustfmt::skip]
pub static OPCODE_TABLE: [Opcode; 256] = [
    // 0x00
    op("BRK", Imp, 7), op("ORA", Izx, 6), op("KIL", Imp, 0), op("SLO", Izx, 8),
    op("NOP", Zp0, 3), op("ORA", Zp0, 3), op("ASL", Zp0, 5), op("SLO", Zp0, 5),
    op("PHP", Imp, 3), op("ORA", Imm, 2), op("ASL", Acc, 2), op("???", Imm, 2),
    op("NOP", Abs, 4), op("ORA", Abs, 4), op("ASL", Abs, 6), op("SLO", Abs, 6),
    // 0x10
    op("BPL", Rel, 2), op("ORA", Izy, 5), op("KIL", Imp, 0), op("SLO", Izy, 8),
    op("NOP", Zpx, 4), op("ORA", Zpx, 4), op("ASL", Zpx, 6), op("SLO", Zpx, 6),
    op("CLC", Imp, 2), op("ORA", Aby, 4), op("NOP", Imp, 2), op("SLO", Aby, 7),
    op("NOP", Abx, 4), op("ORA", Abx, 4), op("ASL", Abx, 7), op("SLO", Abx, 7),
    // 0x20
    op("JSR", Abs, 6), op("AND", Izx, 6), op("KIL", Imp, 0), op("RLA", Izx, 8),
    op("BIT", Zp0, 3), op("AND", Zp0, 3), op("ROL", Zp0, 5), op("RLA", Zp0, 5),
    op("PLP", Imp, 4), op("AND", Imm, 2), op("ROL", Acc, 2), op("???", Imm, 2),
    op("BIT", Abs, 4), op("AND", Abs, 4), op("ROL", Abs, 6), op("RLA", Abs, 6),
    // 0x30
    op("BMI", Rel, 2), op("AND", Izy, 5), op("KIL", Imp, 0), op("RLA", Izy, 8),
    op("NOP", Zpx, 4), op("AND", Zpx, 4), op("ROL", Zpx, 6), op("RLA", Zpx, 6),
    op("SEC", Imp, 2), op("AND", Aby, 4), op("NOP", Imp, 2), op("RLA", Aby, 7),
    op("NOP", Abx, 4), op("AND", Abx, 4), op("ROL", Abx, 7), op("RLA", Abx, 7),
    // 0x40
    op("RTI", Imp, 6), op("EOR", Izx, 6), op("KIL", Imp, 0), op("SRE", Izx, 8),
    op("NOP", Zp0, 3), op("EOR", Zp0, 3), op("LSR", Zp0, 5), op("SRE", Zp0, 5),
    op("PHA", Imp, 3), op("EOR", Imm, 2), op("LSR", Acc, 2), op("???", Imm, 2),
    op("JMP", Abs, 3), op("EOR", Abs, 4), op("LSR", Abs, 6), op("SRE", Abs, 6),
    // 0x50
    op("BVC", Rel, 2), op("EOR", Izy, 5), op("KIL", Imp, 0), op("SRE", Izy, 8),
    op("NOP", Zpx, 4), op("EOR", Zpx, 4), op("LSR", Zpx, 6), op("SRE", Zpx, 6),
    op("CLI", Imp, 2), op("EOR", Aby, 4), op("NOP", Imp, 2), op("SRE", Aby, 7),
    op("NOP", Abx, 4), op("EOR", Abx, 4), op("LSR", Abx, 7), op("SRE", Abx, 7),
    // 0x60
    op("RTS", Imp, 6), op("ADC", Izx, 6), op("KIL", Imp, 0), op("RRA", Izx, 8),
    op("NOP", Zp0, 3), op("ADC", Zp0, 3), op("ROR", Zp0, 5), op("RRA", Zp0, 5),
    op("PLA", Imp, 4), op("ADC", Imm, 2), op("ROR", Acc, 2), op("???", Imm, 2),
    op("JMP", Ind, 5), op("ADC", Abs, 4), op("ROR", Abs, 6), op("RRA", Abs, 6),
    // 0x70
    op("BVS", Rel, 2), op("ADC", Izy, 5), op("KIL", Imp, 0), op("RRA", Izy, 8),
    op("NOP", Zpx, 4), op("ADC", Zpx, 4), op("ROR", Zpx, 6), op("RRA", Zpx, 6),
    op("SEI", Imp, 2), op("ADC", Aby, 4), op("NOP", Imp, 2), op("RRA", Aby, 7),
    op("NOP", Abx, 4), op("ADC", Abx, 4), op("ROR", Abx, 7), op("RRA", Abx, 7),
    // 0x80
    op("NOP", Imm, 2), op("STA", Izx, 6), op("NOP", Imm, 2), op("SAX", Izx, 6),
    op("STY", Zp0, 3), op("STA", Zp0, 3), op("STX", Zp0, 3), op("SAX", Zp0, 3),
    op("DEY", Imp, 2), op("NOP", Imm, 2), op("TXA", Imp, 2), op("???", Imm, 2),
    op("STY", Abs, 4), op("STA", Abs, 4), op("STX", Abs, 4), op("SAX", Abs, 4),
    // 0x90
    op("BCC", Rel, 2), op("STA", Izy, 6), op("KIL", Imp, 0), op("???", Izy, 6),
    op("STY", Zpx, 4), op("STA", Zpx, 4), op("STX", Zpy, 4), op("SAX", Zpy, 4),
    op("TYA", Imp, 2), op("STA", Aby, 5), op("TXS", Imp, 2), op("???", Aby, 5),
    op("???", Abx, 5), op("STA", Abx, 5), op("???", Aby, 5), op("???", Aby, 5),
    // 0xA0
    op("LDY", Imm, 2), op("LDA", Izx, 6), op("LDX", Imm, 2), op("LAX", Izx, 6),
    op("LDY", Zp0, 3), op("LDA", Zp0, 3), op("LDX", Zp0, 3), op("LAX", Zp0, 3),
    op("TAY", Imp, 2), op("LDA", Imm, 2), op("TAX", Imp, 2), op("???", Imm, 2),
    op("LDY", Abs, 4), op("LDA", Abs, 4), op("LDX", Abs, 4), op("LAX", Abs, 4),
    // 0xB0
    op("BCS", Rel, 2), op("LDA", Izy, 5), op("KIL", Imp, 0), op("LAX", Izy, 5),
    op("LDY", Zpx, 4), op("LDA", Zpx, 4), op("LDX", Zpy, 4), op("LAX", Zpy, 4),
    op("CLV", Imp, 2), op("LDA", Aby, 4), op("TSX", Imp, 2), op("???", Aby, 4),
    op("LDY", Abx, 4), op("LDA", Abx, 4), op("LDX", Aby, 4), op("LAX", Aby, 4),
    // 0xC0
    op("CPY", Imm, 2), op("CMP", Izx, 6), op("NOP", Imm, 2), op("DCP", Izx, 8),
    op("CPY", Zp0, 3), op("CMP", Zp0, 3), op("DEC", Zp0, 5), op("DCP", Zp0, 5),
    op("INY", Imp, 2), op("CMP", Imm, 2), op("DEX", Imp, 2), op("???", Imm, 2),
    op("CPY", Abs, 4), op("CMP", Abs, 4), op("DEC", Abs, 6), op("DCP", Abs, 6),
    // 0xD0
    op("BNE", Rel, 2), op("CMP", Izy, 5), op("KIL", Imp, 0), op("DCP", Izy, 8),
    op("NOP", Zpx, 4), op("CMP", Zpx, 4), op("DEC", Zpx, 6), op("DCP", Zpx, 6),
    op("CLD", Imp, 2), op("CMP", Aby, 4), op("NOP", Imp, 2), op("DCP", Aby, 7),
    op("NOP", Abx, 4), op("CMP", Abx, 4), op("DEC", Abx, 7), op("DCP", Abx, 7),
    // 0xE0
    op("CPX", Imm, 2), op("SBC", Izx, 6), op("NOP", Imm, 2), op("ISC", Izx, 8),
    op("CPX", Zp0, 3), op("SBC", Zp0, 3), op("INC", Zp0, 5), op("ISC", Zp0, 5),
    op("INX", Imp, 2), op("SBC", Imm, 2), op("NOP", Imp, 2), op("SBC", Imm, 2),
    op("CPX", Abs, 4), op("SBC", Abs, 4), op("INC", Abs, 6), op("ISC", Abs, 6),
    // 0xF0
    op("BEQ", Rel, 2), op("SBC", Izy, 5), op("KIL", Imp, 0), op("ISC", Izy, 8),
    op("NOP", Zpx, 4), op("SBC", Zpx, 4), op("INC", Zpx, 6), op("ISC", Zpx, 6),
    op("SED", Imp, 2), op("SBC", Aby, 4), op("NOP", Imp, 2), op("ISC", Aby, 7),
    op("NOP", Abx, 4), op("SBC", Abx, 4), op("INC", Abx, 7), op("ISC", Abx, 7),
];
