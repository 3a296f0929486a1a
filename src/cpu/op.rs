#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    /// ASCII Adjust After Addition
    Aaa,

    /// ASCII Adjust AX Before Division
    Aad,

    /// ASCII Adjust AX After Multiply
    Aam,

    /// ASCII Adjust AL After Subtraction
    Aas,

    Adc8,
    Adc16,
    Add8,
    Add16,
    And8,
    And16,

    /// Check Array Index Against Bounds (80186+)
    Bound,

    CallFar,
    CallNear,

    /// Convert Byte to Word
    Cbw,

    /// Clear Carry Flag
    Clc,

    /// Clear Direction Flag
    Cld,

    /// Clear Interrupt Flag
    Cli,

    /// Complement Carry Flag
    Cmc,

    Cmp8,
    Cmp16,
    Cmpsb,
    Cmpsw,

    /// Convert Word to Doubleword
    Cwd,

    /// Decimal Adjust AL after Addition
    Daa,

    /// Decimal Adjust AL after Subtraction
    Das,

    Dec8,
    Dec16,
    Div8,
    Div16,

    /// Make Stack Frame for Procedure Parameters (80186+)
    Enter,

    Hlt,
    Idiv8,
    Idiv16,
    Imul8,
    Imul16,

    /// Input from Port
    In8,
    In16,

    Inc8,
    Inc16,

    /// Input from Port to String (80186+)
    Insb,
    Insw,

    Int,
    Into,
    Iret,

    /// Jump if above (CF=0 and ZF=0).    (alias: jnbe)
    Ja,

    /// Jump if carry (CF=1).    (alias: jb, jnae)
    Jc,

    /// Jump if CX register is 0.
    Jcxz,

    /// Jump if greater (ZF=0 and SF=OF).    (alias: jnle)
    Jg,

    /// Jump if less (SF != OF).    (alias: jnge)
    Jl,

    JmpFar,
    JmpNear,
    JmpShort,

    /// Jump if not above (CF=1 or ZF=1).    (alias: jbe)
    Jna,

    /// Jump if not carry (CF=0).    (alias: jae, jnb)
    Jnc,

    /// Jump if not greater (ZF=1 or SF != OF).    (alias: jle)
    Jng,

    /// Jump if not less (SF=OF).    (alias: jge)
    Jnl,

    /// Jump if not overflow (OF=0).
    Jno,

    /// Jump if not sign (SF=0).
    Jns,

    /// Jump if not zero (ZF=0).    (alias: jne)
    Jnz,

    /// Jump if overflow (OF=1).
    Jo,

    /// Jump short if parity even (PF=1)
    Jpe,

    /// Jump short if parity odd (PF=0).
    Jpo,

    /// Jump if sign (SF=1).
    Js,

    /// Jump if zero (ZF=1).    (alias: je)
    Jz,

    /// Load Status Flags into AH Register
    Lahf,

    Lds,

    /// Load Effective Address
    Lea16,

    /// High Level Procedure Exit (80186+)
    Leave,

    Les,
    Lodsb,
    Lodsw,
    Loop,
    Loope,
    Loopne,
    Mov8,
    Mov16,
    Movsb,
    Movsw,
    Mul8,
    Mul16,
    Neg8,
    Neg16,
    Nop,
    Not8,
    Not16,
    Or8,
    Or16,
    Out8,
    Out16,

    /// Output String to Port (80186+)
    Outsb,
    Outsw,

    Pop16,

    /// Pop DI, SI, BP, BX, DX, CX, and AX (80186+)
    Popa,

    /// Pop top of stack into FLAGS.
    Popf,

    Push16,

    /// Push AX, CX, DX, BX, original SP, BP, SI, and DI (80186+)
    Pusha,

    /// Push FLAGS register onto stack
    Pushf,

    Rcl8,
    Rcl16,
    Rcr8,
    Rcr16,
    Retf,
    Retn,
    Rol8,
    Rol16,
    Ror8,
    Ror16,

    /// Store AH into Flags
    Sahf,

    /// undocumented: set AL from carry
    /// http://www.rcollins.org/secrets/opcodes/SALC.html
    Salc,

    Sar8,
    Sar16,

    /// Integer Subtraction with Borrow
    Sbb8,
    Sbb16,

    Scasb,
    Scasw,

    Shl8,
    Shl16,
    Shr8,
    Shr16,

    /// Set Carry Flag
    Stc,

    /// Set Direction Flag
    Std,

    /// Set Interrupt Flag
    Sti,

    Stosb,
    Stosw,
    Sub8,
    Sub16,
    Test8,
    Test16,

    /// Exchange Register/Memory with Register
    Xchg8,
    Xchg16,

    Xlatb,

    Xor8,
    Xor16,

    Uninitialized,
}

impl Op {
    /// string ops eligible for a repeat prefix
    pub fn is_string_op(&self) -> bool {
        match *self {
            Op::Movsb | Op::Movsw |
            Op::Cmpsb | Op::Cmpsw |
            Op::Lodsb | Op::Lodsw |
            Op::Stosb | Op::Stosw |
            Op::Scasb | Op::Scasw |
            Op::Insb | Op::Insw |
            Op::Outsb | Op::Outsw => true,
            _ => false,
        }
    }

    /// string ops whose repetition also terminates on the zero flag
    pub fn is_zf_string_op(&self) -> bool {
        match *self {
            Op::Cmpsb | Op::Cmpsw | Op::Scasb | Op::Scasw => true,
            _ => false,
        }
    }
}
