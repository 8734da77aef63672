//! Packet type definitions for the RFXCOM protocol.
//!
//! The packet type is the first payload byte of every frame and selects
//! how the rest of the packet is laid out.

/// RFXtrx packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    // Control plane (0x00-0x03)
    /// Interface control command sent to the transceiver.
    InterfaceControl = 0x00,
    /// Interface message from the transceiver.
    InterfaceMessage = 0x01,
    /// Response to a transmission request.
    TransmitterMessage = 0x02,
    /// Undecoded RF message.
    UndecodedRfMessage = 0x03,

    // Lighting and actuators (0x10-0x1F)
    /// X10, ARC, ELRO and similar.
    Lighting1 = 0x10,
    /// AC, HomeEasy EU, ANSLUT.
    Lighting2 = 0x11,
    /// Ikea Koppla.
    Lighting3 = 0x12,
    /// PT2262 and compatibles.
    Lighting4 = 0x13,
    /// LightwaveRF, EMW100, BBSB and others.
    Lighting5 = 0x14,
    /// Blyss.
    Lighting6 = 0x15,
    /// Chimes.
    Chime = 0x16,
    /// Fans.
    Fan = 0x17,
    /// Harrison curtains.
    Curtain1 = 0x18,
    /// Blinds.
    Blinds1 = 0x19,
    /// Somfy RTS.
    Rfy = 0x1A,
    /// Home Confort.
    HomeConfort = 0x1B,

    // Security (0x20-0x2F)
    /// Security sensors and remotes.
    Security1 = 0x20,
    /// KeeLoq.
    Security2 = 0x21,
    /// Camera pan/tilt.
    Camera1 = 0x28,
    /// ATI and Medion remotes.
    RemoteControl = 0x30,

    // Climate (0x40-0x4F)
    /// Digimax thermostats.
    Thermostat1 = 0x40,
    /// HE105 and RTS10.
    Thermostat2 = 0x41,
    /// Mertik-Maxitrol.
    Thermostat3 = 0x42,
    /// BBQ sensors.
    Bbq = 0x4E,
    /// Combined temperature and rain.
    TemperatureRain = 0x4F,

    // Sensors (0x50-0x5F)
    /// Temperature.
    Temperature = 0x50,
    /// Humidity.
    Humidity = 0x51,
    /// Temperature and humidity.
    TemperatureHumidity = 0x52,
    /// Barometric pressure.
    Barometric = 0x53,
    /// Temperature, humidity and barometric pressure.
    TemperatureHumidityBarometric = 0x54,
    /// Rain.
    Rain = 0x55,
    /// Wind.
    Wind = 0x56,
    /// UV.
    Uv = 0x57,
    /// Date and time.
    DateTime = 0x58,
    /// Current.
    Current = 0x59,
    /// Energy.
    Energy = 0x5A,
    /// Current and energy.
    CurrentEnergy = 0x5B,
    /// Power.
    Power = 0x5C,
    /// Weighing scales.
    Weighing = 0x5D,
    /// Gas meters.
    Gas = 0x5E,
    /// Water meters.
    Water = 0x5F,

    // RFXCOM peripherals (0x70-0x7F)
    /// RFXSensor.
    RfxSensor = 0x70,
    /// RFXMeter.
    RfxMeter = 0x71,
    /// FS20.
    Fs20 = 0x72,
}

impl PacketType {
    /// Attempts to parse a packet type from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::InterfaceControl),
            0x01 => Some(Self::InterfaceMessage),
            0x02 => Some(Self::TransmitterMessage),
            0x03 => Some(Self::UndecodedRfMessage),
            0x10 => Some(Self::Lighting1),
            0x11 => Some(Self::Lighting2),
            0x12 => Some(Self::Lighting3),
            0x13 => Some(Self::Lighting4),
            0x14 => Some(Self::Lighting5),
            0x15 => Some(Self::Lighting6),
            0x16 => Some(Self::Chime),
            0x17 => Some(Self::Fan),
            0x18 => Some(Self::Curtain1),
            0x19 => Some(Self::Blinds1),
            0x1A => Some(Self::Rfy),
            0x1B => Some(Self::HomeConfort),
            0x20 => Some(Self::Security1),
            0x21 => Some(Self::Security2),
            0x28 => Some(Self::Camera1),
            0x30 => Some(Self::RemoteControl),
            0x40 => Some(Self::Thermostat1),
            0x41 => Some(Self::Thermostat2),
            0x42 => Some(Self::Thermostat3),
            0x4E => Some(Self::Bbq),
            0x4F => Some(Self::TemperatureRain),
            0x50 => Some(Self::Temperature),
            0x51 => Some(Self::Humidity),
            0x52 => Some(Self::TemperatureHumidity),
            0x53 => Some(Self::Barometric),
            0x54 => Some(Self::TemperatureHumidityBarometric),
            0x55 => Some(Self::Rain),
            0x56 => Some(Self::Wind),
            0x57 => Some(Self::Uv),
            0x58 => Some(Self::DateTime),
            0x59 => Some(Self::Current),
            0x5A => Some(Self::Energy),
            0x5B => Some(Self::CurrentEnergy),
            0x5C => Some(Self::Power),
            0x5D => Some(Self::Weighing),
            0x5E => Some(Self::Gas),
            0x5F => Some(Self::Water),
            0x70 => Some(Self::RfxSensor),
            0x71 => Some(Self::RfxMeter),
            0x72 => Some(Self::Fs20),
            _ => None,
        }
    }
}

impl From<PacketType> for u8 {
    fn from(pkt: PacketType) -> Self {
        pkt as Self
    }
}
