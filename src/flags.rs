//! Bit-flag enumerations stored in integer directory attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One bit of the `userAccountControl` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserAccountControlFlag {
    Script,
    AccountDisable,
    HomeDirRequired,
    Lockout,
    PasswordNotRequired,
    PasswordCantChange,
    EncryptedTextPasswordAllowed,
    TempDuplicateAccount,
    NormalAccount,
    InterdomainTrustAccount,
    WorkstationTrustAccount,
    ServerTrustAccount,
    DoNotExpirePassword,
    MnsLogonAccount,
    SmartcardRequired,
    TrustedForDelegation,
    NotDelegated,
    UseDesKeyOnly,
    DoNotRequirePreauth,
    PasswordExpired,
    TrustedToAuthForDelegation,
    PartialSecretsAccount,
}

impl UserAccountControlFlag {
    /// Every flag, in bit order.
    pub const ALL: [UserAccountControlFlag; 22] = [
        Self::Script,
        Self::AccountDisable,
        Self::HomeDirRequired,
        Self::Lockout,
        Self::PasswordNotRequired,
        Self::PasswordCantChange,
        Self::EncryptedTextPasswordAllowed,
        Self::TempDuplicateAccount,
        Self::NormalAccount,
        Self::InterdomainTrustAccount,
        Self::WorkstationTrustAccount,
        Self::ServerTrustAccount,
        Self::DoNotExpirePassword,
        Self::MnsLogonAccount,
        Self::SmartcardRequired,
        Self::TrustedForDelegation,
        Self::NotDelegated,
        Self::UseDesKeyOnly,
        Self::DoNotRequirePreauth,
        Self::PasswordExpired,
        Self::TrustedToAuthForDelegation,
        Self::PartialSecretsAccount,
    ];

    /// The flag's bit.
    pub const fn bit(self) -> i32 {
        match self {
            Self::Script => 0x0001,
            Self::AccountDisable => 0x0002,
            Self::HomeDirRequired => 0x0008,
            Self::Lockout => 0x0010,
            Self::PasswordNotRequired => 0x0020,
            Self::PasswordCantChange => 0x0040,
            Self::EncryptedTextPasswordAllowed => 0x0080,
            Self::TempDuplicateAccount => 0x0100,
            Self::NormalAccount => 0x0200,
            Self::InterdomainTrustAccount => 0x0800,
            Self::WorkstationTrustAccount => 0x1000,
            Self::ServerTrustAccount => 0x2000,
            Self::DoNotExpirePassword => 0x0001_0000,
            Self::MnsLogonAccount => 0x0002_0000,
            Self::SmartcardRequired => 0x0004_0000,
            Self::TrustedForDelegation => 0x0008_0000,
            Self::NotDelegated => 0x0010_0000,
            Self::UseDesKeyOnly => 0x0020_0000,
            Self::DoNotRequirePreauth => 0x0040_0000,
            Self::PasswordExpired => 0x0080_0000,
            Self::TrustedToAuthForDelegation => 0x0100_0000,
            Self::PartialSecretsAccount => 0x0400_0000,
        }
    }

    /// Whether this flag's bit is set in `value`.
    pub const fn is_set_in(self, value: i32) -> bool {
        value & self.bit() == self.bit()
    }

    /// Decode every flag set in `value`.
    pub fn decode(value: i32) -> impl Iterator<Item = UserAccountControlFlag> {
        Self::ALL.into_iter().filter(move |flag| flag.is_set_in(value))
    }
}

impl fmt::Display for UserAccountControlFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const GROUP_TYPE_GLOBAL: i32 = 0x0000_0002;
const GROUP_TYPE_DOMAIN_LOCAL: i32 = 0x0000_0004;
const GROUP_TYPE_UNIVERSAL: i32 = 0x0000_0008;
const GROUP_TYPE_SECURITY: i32 = i32::MIN; // 0x8000_0000

/// Value of the `groupType` attribute: scope combined with security or
/// distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupType {
    GlobalDistribution,
    DomainLocalDistribution,
    UniversalDistribution,
    GlobalSecurity,
    DomainLocalSecurity,
    UniversalSecurity,
}

impl GroupType {
    /// The signed 32-bit value the directory stores.
    pub const fn value(self) -> i32 {
        match self {
            Self::GlobalDistribution => GROUP_TYPE_GLOBAL,
            Self::DomainLocalDistribution => GROUP_TYPE_DOMAIN_LOCAL,
            Self::UniversalDistribution => GROUP_TYPE_UNIVERSAL,
            Self::GlobalSecurity => GROUP_TYPE_GLOBAL | GROUP_TYPE_SECURITY,
            Self::DomainLocalSecurity => GROUP_TYPE_DOMAIN_LOCAL | GROUP_TYPE_SECURITY,
            Self::UniversalSecurity => GROUP_TYPE_UNIVERSAL | GROUP_TYPE_SECURITY,
        }
    }

    /// Map a stored value back. Builtin and system bits are ignored.
    pub fn from_value(value: i32) -> Option<Self> {
        let security = value & GROUP_TYPE_SECURITY != 0;
        let scope = value & (GROUP_TYPE_GLOBAL | GROUP_TYPE_DOMAIN_LOCAL | GROUP_TYPE_UNIVERSAL);
        match (scope, security) {
            (GROUP_TYPE_GLOBAL, false) => Some(Self::GlobalDistribution),
            (GROUP_TYPE_DOMAIN_LOCAL, false) => Some(Self::DomainLocalDistribution),
            (GROUP_TYPE_UNIVERSAL, false) => Some(Self::UniversalDistribution),
            (GROUP_TYPE_GLOBAL, true) => Some(Self::GlobalSecurity),
            (GROUP_TYPE_DOMAIN_LOCAL, true) => Some(Self::DomainLocalSecurity),
            (GROUP_TYPE_UNIVERSAL, true) => Some(Self::UniversalSecurity),
            _ => None,
        }
    }

    pub const fn is_security(self) -> bool {
        matches!(
            self,
            Self::GlobalSecurity | Self::DomainLocalSecurity | Self::UniversalSecurity
        )
    }
}
