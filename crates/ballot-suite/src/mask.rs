/// Which ballot-mask built-in a case exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskType {
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
}

impl MaskType {
    /// Enumeration order used by the registry.
    pub const ALL: [MaskType; 5] = [
        MaskType::Eq,
        MaskType::Ge,
        MaskType::Gt,
        MaskType::Le,
        MaskType::Lt,
    ];

    /// The GLSL built-in identifier for this mask.
    pub fn builtin_name(self) -> &'static str {
        match self {
            MaskType::Eq => "gl_SubGroupEqMaskARB",
            MaskType::Ge => "gl_SubGroupGeMaskARB",
            MaskType::Gt => "gl_SubGroupGtMaskARB",
            MaskType::Le => "gl_SubGroupLeMaskARB",
            MaskType::Lt => "gl_SubGroupLtMaskARB",
        }
    }

    /// Lowercased built-in, used to name registered cases.
    pub fn case_name(self) -> String {
        self.builtin_name().to_ascii_lowercase()
    }

    /// Whether bit `bit` must be set in the mask seen by `invocation`.
    pub fn bit_expected(self, bit: u32, invocation: u32) -> bool {
        match self {
            MaskType::Eq => bit == invocation,
            MaskType::Ge => bit >= invocation,
            MaskType::Gt => bit > invocation,
            MaskType::Le => bit <= invocation,
            MaskType::Lt => bit < invocation,
        }
    }

    /// Reference mask value for one invocation.
    ///
    /// The ballot mask is a 64-bit value, so subgroup sizes above 64 are not
    /// representable; callers never request them.
    pub fn expected_mask(self, invocation: u32, subgroup_size: u32) -> u64 {
        debug_assert!(subgroup_size <= 64);
        let mut mask = 0u64;
        for bit in 0..subgroup_size {
            if self.bit_expected(bit, invocation) {
                mask |= 1u64 << bit;
            }
        }
        mask
    }
}
