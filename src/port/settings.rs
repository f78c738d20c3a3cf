//! Line settings and their translation onto the termios structure.
//!
//! The portable side (`LineSettings` and its enums) stays flag-oriented and
//! readable. All bit manipulation happens in [`LineSettings::apply_to`], which
//! is the only place that touches `libc::termios` fields.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;

/// Line speed in bits per second.
///
/// Each member resolves to exactly one `libc::B*` constant through
/// [`BaudRate::to_speed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B0,
    B50,
    B75,
    B110,
    B134,
    B150,
    B200,
    B300,
    B600,
    B1200,
    B1800,
    B2400,
    B4800,
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B230400,
    B460800,
    B500000,
    B576000,
    B921600,
    B1000000,
    B1152000,
    B1500000,
    B2000000,
    B2500000,
    B3500000,
    B4000000,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [BaudRate; 30] = [
        BaudRate::B0,
        BaudRate::B50,
        BaudRate::B75,
        BaudRate::B110,
        BaudRate::B134,
        BaudRate::B150,
        BaudRate::B200,
        BaudRate::B300,
        BaudRate::B600,
        BaudRate::B1200,
        BaudRate::B1800,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
        BaudRate::B230400,
        BaudRate::B460800,
        BaudRate::B500000,
        BaudRate::B576000,
        BaudRate::B921600,
        BaudRate::B1000000,
        BaudRate::B1152000,
        BaudRate::B1500000,
        BaudRate::B2000000,
        BaudRate::B2500000,
        BaudRate::B3500000,
        BaudRate::B4000000,
    ];

    /// Resolve to the platform speed constant expected by `cfsetispeed`/`cfsetospeed`.
    pub const fn to_speed(self) -> libc::speed_t {
        match self {
            BaudRate::B0 => libc::B0,
            BaudRate::B50 => libc::B50,
            BaudRate::B75 => libc::B75,
            BaudRate::B110 => libc::B110,
            BaudRate::B134 => libc::B134,
            BaudRate::B150 => libc::B150,
            BaudRate::B200 => libc::B200,
            BaudRate::B300 => libc::B300,
            BaudRate::B600 => libc::B600,
            BaudRate::B1200 => libc::B1200,
            BaudRate::B1800 => libc::B1800,
            BaudRate::B2400 => libc::B2400,
            BaudRate::B4800 => libc::B4800,
            BaudRate::B9600 => libc::B9600,
            BaudRate::B19200 => libc::B19200,
            BaudRate::B38400 => libc::B38400,
            BaudRate::B57600 => libc::B57600,
            BaudRate::B115200 => libc::B115200,
            BaudRate::B230400 => libc::B230400,
            BaudRate::B460800 => libc::B460800,
            BaudRate::B500000 => libc::B500000,
            BaudRate::B576000 => libc::B576000,
            BaudRate::B921600 => libc::B921600,
            BaudRate::B1000000 => libc::B1000000,
            BaudRate::B1152000 => libc::B1152000,
            BaudRate::B1500000 => libc::B1500000,
            BaudRate::B2000000 => libc::B2000000,
            BaudRate::B2500000 => libc::B2500000,
            BaudRate::B3500000 => libc::B3500000,
            BaudRate::B4000000 => libc::B4000000,
        }
    }

    /// The nominal rate in bits per second.
    pub const fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B0 => 0,
            BaudRate::B50 => 50,
            BaudRate::B75 => 75,
            BaudRate::B110 => 110,
            BaudRate::B134 => 134,
            BaudRate::B150 => 150,
            BaudRate::B200 => 200,
            BaudRate::B300 => 300,
            BaudRate::B600 => 600,
            BaudRate::B1200 => 1200,
            BaudRate::B1800 => 1800,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
            BaudRate::B230400 => 230400,
            BaudRate::B460800 => 460800,
            BaudRate::B500000 => 500000,
            BaudRate::B576000 => 576000,
            BaudRate::B921600 => 921600,
            BaudRate::B1000000 => 1000000,
            BaudRate::B1152000 => 1152000,
            BaudRate::B1500000 => 1500000,
            BaudRate::B2000000 => 2000000,
            BaudRate::B2500000 => 2500000,
            BaudRate::B3500000 => 3500000,
            BaudRate::B4000000 => 4000000,
        }
    }

    /// Look up the member for a rate given in bits per second.
    pub fn from_bits_per_second(bps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.bits_per_second() == bps)
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = PortError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::from_bits_per_second(bps)
            .ok_or_else(|| PortError::config(format!("unsupported baud rate {bps}")))
    }
}

impl From<BaudRate> for u32 {
    fn from(baud: BaudRate) -> Self {
        baud.bits_per_second()
    }
}

impl std::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl DataBits {
    /// The `CS*` character-size flag for this width.
    pub const fn to_flag(self) -> libc::tcflag_t {
        match self {
            DataBits::Five => libc::CS5,
            DataBits::Six => libc::CS6,
            DataBits::Seven => libc::CS7,
            DataBits::Eight => libc::CS8,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = PortError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(PortError::config(format!("unsupported data bit count {other}"))),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        bits.bits()
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl StopBits {
    /// The `CSTOPB` contribution: set for two stop bits, empty for one.
    pub const fn to_flag(self) -> libc::tcflag_t {
        match self {
            StopBits::One => 0,
            StopBits::Two => libc::CSTOPB,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = PortError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(PortError::config(format!("unsupported stop bit count {other}"))),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(bits: StopBits) -> Self {
        bits.bits()
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Parity::None)
    }
}

/// A plain "parity enabled" flag selects even parity.
impl From<bool> for Parity {
    fn from(enabled: bool) -> Self {
        if enabled {
            Parity::Even
        } else {
            Parity::None
        }
    }
}

/// Configuration applied to an open port in one `tcsetattr` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSettings {
    /// Input (receive) line speed.
    pub receive_baud: BaudRate,

    /// Output (transmit) line speed.
    pub transmit_baud: BaudRate,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// RTS/CTS flow control.
    pub hardware_flow_control: bool,

    /// XON/XOFF flow control, in both directions and restartable by any character.
    pub software_flow_control: bool,

    /// Output post-processing (`OPOST`).
    pub output_processing: bool,

    /// VMIN: characters to accumulate before a read returns.
    pub min_chars: u8,

    /// VTIME in tenths of a second; 0 waits indefinitely.
    pub min_wait_tenths: u8,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            receive_baud: BaudRate::B9600,
            transmit_baud: BaudRate::B9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            hardware_flow_control: false,
            software_flow_control: false,
            output_processing: false,
            min_chars: 1,
            min_wait_tenths: 0,
        }
    }
}

impl LineSettings {
    /// Default 8N1 settings at the given rate in both directions.
    pub fn with_baud(baud: BaudRate) -> Self {
        Self {
            receive_baud: baud,
            transmit_baud: baud,
            ..Self::default()
        }
    }

    /// VTIME as a duration.
    pub fn min_wait(&self) -> Duration {
        Duration::from_millis(u64::from(self.min_wait_tenths) * 100)
    }

    /// Write these settings into `termios`.
    ///
    /// Flags this type does not manage keep whatever value `termios` already
    /// holds, so the caller should start from a `tcgetattr` baseline.
    pub fn apply_to(&self, termios: &mut libc::termios) -> io::Result<()> {
        // SAFETY: `termios` is a valid, exclusively borrowed structure and the
        // speed values come from the closed `BaudRate` mapping.
        let rc = unsafe { libc::cfsetispeed(termios, self.receive_baud.to_speed()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: as above.
        let rc = unsafe { libc::cfsetospeed(termios, self.transmit_baud.to_speed()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        match self.parity {
            Parity::None => termios.c_cflag &= !(libc::PARENB | libc::PARODD),
            Parity::Even => {
                termios.c_cflag |= libc::PARENB;
                termios.c_cflag &= !libc::PARODD;
            }
            Parity::Odd => termios.c_cflag |= libc::PARENB | libc::PARODD,
        }

        termios.c_cflag &= !libc::CSTOPB;
        termios.c_cflag |= self.stop_bits.to_flag();

        termios.c_cflag &= !libc::CSIZE;
        termios.c_cflag |= self.data_bits.to_flag();

        set_flags(&mut termios.c_cflag, libc::CRTSCTS, self.hardware_flow_control);
        set_flags(
            &mut termios.c_iflag,
            libc::IXON | libc::IXOFF | libc::IXANY,
            self.software_flow_control,
        );

        // Receiver on, modem control lines ignored.
        termios.c_cflag |= libc::CREAD | libc::CLOCAL;

        // Raw input: no line buffering, echo or signal characters.
        termios.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ECHOE | libc::ISIG);

        set_flags(&mut termios.c_oflag, libc::OPOST, self.output_processing);

        termios.c_cc[libc::VMIN] = self.min_chars;
        termios.c_cc[libc::VTIME] = self.min_wait_tenths;

        Ok(())
    }
}

fn set_flags(field: &mut libc::tcflag_t, mask: libc::tcflag_t, enabled: bool) {
    if enabled {
        *field |= mask;
    } else {
        *field &= !mask;
    }
}
