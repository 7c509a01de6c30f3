//! Status codes of the BMI2 sensor API.
//!
//! The sensor API's callbacks return a signed byte: `0` for success, positive
//! values for warnings and negative values for errors. [`Bmi2Status`] names
//! each code, describes it, and converts engine results into the code the
//! API expects back from its `read`/`write` callbacks.

use core::fmt;

use crate::error::Error;

macro_rules! bmi2_status {
    ($( $(#[$doc:meta])* $name:ident = $code:literal => $text:literal, )*) => {
        /// A BMI2 sensor API return code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum Bmi2Status {
            $( $(#[$doc])* $name, )*
            /// A code this crate does not know.
            Unknown(i8),
        }

        impl Bmi2Status {
            /// Decodes a raw return code.
            pub const fn from_code(code: i8) -> Self {
                match code {
                    $( $code => Self::$name, )*
                    other => Self::Unknown(other),
                }
            }

            /// Raw return code.
            pub const fn code(self) -> i8 {
                match self {
                    $( Self::$name => $code, )*
                    Self::Unknown(code) => code,
                }
            }

            /// Human-readable explanation of the code.
            pub const fn description(self) -> &'static str {
                match self {
                    $( Self::$name => $text, )*
                    Self::Unknown(_) => "Unknown error code",
                }
            }
        }
    };
}

bmi2_status! {
    /// Success.
    Ok = 0 => "Success",
    /// FIFO empty.
    FifoEmpty = 1 => "FIFO empty",
    /// FIFO partial read.
    PartialRead = 2 => "FIFO partial read",
    /// Null pointer.
    NullPtr = -1 => "Null pointer error: a pointer the API needs was not initialized",
    /// Communication failure.
    ComFail = -2 => "Communication failure: read/write operation failed or the device lost power",
    /// Device not found.
    DevNotFound = -3 => "Device not found: the chip id read back was incorrect",
    /// Out of range.
    OutOfRange = -4 => "Out of range: data or range exceeds the limits for accel/gyro FOC",
    /// Invalid accelerometer configuration.
    AccInvalidCfg = -5 => "Invalid accel configuration: range, bandwidth or filter performance in 0x40",
    /// Invalid gyroscope configuration.
    GyroInvalidCfg = -6 => "Invalid gyro configuration: range, bandwidth or filter performance in 0x42",
    /// Invalid accelerometer and gyroscope configuration.
    AccGyrInvalidCfg = -7 => "Invalid accel-gyro configuration in 0x40 and 0x42",
    /// Invalid sensor.
    InvalidSensor = -8 => "Invalid sensor: requested feature does not match the available one",
    /// Configuration load failure.
    ConfigLoad = -9 => "Configuration load error: loading the configuration into the sensor failed",
    /// Invalid feature page.
    InvalidPage = -10 => "Invalid page: feature configuration page write failed",
    /// Invalid feature bit.
    InvalidFeatBit = -11 => "Invalid feature bit",
    /// Invalid interrupt pin.
    InvalidIntPin = -12 => "Invalid interrupt pin: only INT1 and INT2 can be configured",
    /// Advanced power save setting failed.
    SetApsFail = -13 => "APS failure: advanced power mode configuration write failed",
    /// Invalid auxiliary configuration.
    AuxInvalidCfg = -14 => "Invalid AUX configuration: auxiliary interface not enabled properly",
    /// Auxiliary interface busy.
    AuxBusy = -15 => "AUX busy: auxiliary interface engaged while configuring it",
    /// Self-test failed.
    SelfTestFail = -16 => "Self-test failed: accel self-test data out of bounds",
    /// Axis remap failed.
    RemapError = -17 => "Remap error: assigning remapped axes failed",
    /// Gyroscope user gain update failed.
    GyrUserGainUpdFail = -18 => "Gyro user gain update failed",
    /// Self-test not done.
    SelfTestNotDone = -19 => "Self-test not done: still running or not completed",
    /// Invalid input.
    InvalidInput = -20 => "Invalid input: sensor input validity check failed",
    /// Invalid status.
    InvalidStatus = -21 => "Invalid status: feature/sensor validity check failed",
    /// CRT test failed.
    CrtError = -22 => "CRT error: the CRT test failed",
    /// Self-test already running.
    StAlreadyRunning = -23 => "Self-test already running",
    /// CRT download preparation failed.
    CrtReadyForDlFailAbort = -24 => "CRT ready for download failed: wrong address location",
    /// Download error.
    DlError = -25 => "Download error: write length exceeds the maximum burst length",
    /// Precondition not met.
    PreconError = -26 => "Pre-conditional error: feature precondition not completed",
    /// Aborted.
    AbortError = -27 => "Abort error: device was shaken during CRT test",
    /// Gyroscope cross-axis sensitivity mismatch.
    GyroCrossAxesSenseMismatch = -28 => "Gyro cross-axes sensitivity mismatch",
    /// Self-test not running.
    StNotRunning = -29 => "Self-test not running: disabled while running",
    /// Write cycle ongoing.
    WriteCycleOngoing = -30 => "Write cycle ongoing: another write was started",
    /// Data-ready interrupt failed.
    DataRdyIntFailed = -31 => "Data ready interrupt error: FOC sample limit exceeded",
    /// Invalid FOC position.
    InvalidFocPosition = -32 => "Invalid FOC position: averaged for the wrong axes",
}

impl Bmi2Status {
    /// Returns `true` for [`Bmi2Status::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns `true` for negative codes.
    pub const fn is_error(self) -> bool {
        self.code() < 0
    }

    /// Code handed back to the sensor API for a callback result.
    pub fn from_result<T, E>(result: &core::result::Result<T, Error<E>>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(err) => Self::from(err),
        }
    }
}

impl<E> From<&Error<E>> for Bmi2Status {
    fn from(err: &Error<E>) -> Self {
        match err {
            Error::InvalidArgument | Error::InvalidConfig => Self::InvalidInput,
            Error::DeviceNotFound => Self::DevNotFound,
            Error::Interface(_) | Error::Busy | Error::Stalled | Error::AlreadyInitialized => {
                Self::ComFail
            }
        }
    }
}

impl From<i8> for Bmi2Status {
    fn from(code: i8) -> Self {
        Self::from_code(code)
    }
}

impl From<Bmi2Status> for i8 {
    fn from(status: Bmi2Status) -> Self {
        status.code()
    }
}

impl fmt::Display for Bmi2Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str(self.description());
        }
        let kind = if self.is_error() { "Error" } else { "Warning" };
        write!(f, "{kind} [{}] : {}", self.code(), self.description())
    }
}
