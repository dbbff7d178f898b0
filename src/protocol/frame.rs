use crate::core::{Error, Result, FRAME_LINE_LEN};

/// Originating role of a protocol line
///
/// The gateway sits between the thermostat and the boiler and reports
/// traffic in both directions, including its own modifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Request as sent by the thermostat (`T`)
    Thermostat,
    /// Request as forwarded to the boiler (`R`)
    BoilerRequest,
    /// Response as sent by the boiler (`B`)
    Boiler,
    /// Response as returned to the thermostat (`A`)
    ThermostatAnswer,
}

impl Source {
    /// Parses the role character that opens every status line
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'T' => Some(Source::Thermostat),
            'R' => Some(Source::BoilerRequest),
            'B' => Some(Source::Boiler),
            'A' => Some(Source::ThermostatAnswer),
            _ => None,
        }
    }

    /// Returns the wire character for this role
    pub fn as_char(&self) -> char {
        match self {
            Source::Thermostat => 'T',
            Source::BoilerRequest => 'R',
            Source::Boiler => 'B',
            Source::ThermostatAnswer => 'A',
        }
    }
}

/// Frame type carried in the low 3 bits of the line's second hex digit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    ReadData,
    WriteData,
    InvalidData,
    Reserved,
    ReadAck,
    WriteAck,
    InvalidAck,
    UnknownDataId,
}

impl FrameType {
    /// Decodes the 3-bit frame type
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x7 {
            0 => FrameType::ReadData,
            1 => FrameType::WriteData,
            2 => FrameType::InvalidData,
            3 => FrameType::Reserved,
            4 => FrameType::ReadAck,
            5 => FrameType::WriteAck,
            6 => FrameType::InvalidAck,
            _ => FrameType::UnknownDataId,
        }
    }

    /// Human-readable frame type name
    pub fn name(&self) -> &'static str {
        match self {
            FrameType::ReadData => "Read-Data",
            FrameType::WriteData => "Write-Data",
            FrameType::InvalidData => "Invalid-Data",
            FrameType::Reserved => "Reserved",
            FrameType::ReadAck => "Read-Ack",
            FrameType::WriteAck => "Write-Ack",
            FrameType::InvalidAck => "Invalid-Ack",
            FrameType::UnknownDataId => "Unknown-DataId",
        }
    }
}

/// Unit conversion applied to the raw 16-bit data word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// Status bitfield, rendered as a binary string
    Flags,
    /// Fixed-point f8.8 value, `data / 256` rounded to 2 decimals
    Float,
    /// Plain counter, passed through unchanged
    Integer,
}

impl Converter {
    /// Applies the conversion to a raw data word
    pub fn convert(&self, data: u16) -> Value {
        match self {
            Converter::Flags => Value::Flags(format!("{:b}", data)),
            Converter::Float => {
                Value::Float((data as f64 / 256.0 * 100.0).round() / 100.0)
            }
            Converter::Integer => Value::Integer(data),
        }
    }
}

/// Decoded value of a protocol line; the shape is fully determined by the
/// data id
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Binary string render of a status bitfield
    Flags(String),
    /// Temperature, pressure or percentage
    Float(f64),
    /// Counter value
    Integer(u16),
    /// Raw word for an id not present in the table
    Raw(u16),
}

/// Static table of known data ids: name and unit converter.
///
/// Loaded nowhere and mutated never; ids outside the table pass their raw
/// word through unconverted.
pub fn data_id_entry(data_id: u8) -> Option<(&'static str, Converter)> {
    let entry = match data_id {
        0 => ("status", Converter::Flags),
        1 => ("control_setpoint", Converter::Float),
        9 => ("remote_override_setpoint", Converter::Float),
        14 => ("max_relative_modulation_level", Converter::Float),
        16 => ("room_setpoint", Converter::Float),
        17 => ("relative_modulation_level", Converter::Float),
        18 => ("ch_water_pressure", Converter::Float),
        24 => ("room_temperature", Converter::Float),
        25 => ("boiler_water_temperature", Converter::Float),
        26 => ("dhw_temperature", Converter::Float),
        27 => ("outside_temperature", Converter::Float),
        28 => ("return_water_temperature", Converter::Float),
        56 => ("dhw_setpoint", Converter::Float),
        57 => ("max_ch_water_setpoint", Converter::Float),
        116 => ("burner_starts", Converter::Integer),
        117 => ("ch_pump_starts", Converter::Integer),
        118 => ("dhw_pump_starts", Converter::Integer),
        119 => ("dhw_burner_starts", Converter::Integer),
        120 => ("burner_operation_hours", Converter::Integer),
        121 => ("ch_pump_operation_hours", Converter::Integer),
        122 => ("dhw_pump_valve_operation_hours", Converter::Integer),
        123 => ("dhw_burner_operation_hours", Converter::Integer),
        _ => return None,
    };
    Some(entry)
}

/// One decoded protocol line
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLine {
    /// The raw line text
    pub line: String,
    /// Originating role
    pub source: Source,
    /// Frame type from the low 3 bits of the type digit
    pub frame_type: FrameType,
    /// Data id, key into the static table
    pub data_id: u8,
    /// Raw 16-bit data word
    pub data: u16,
    /// Table name for the data id, if known
    pub name: Option<&'static str>,
    /// Decoded value
    pub value: Value,
}

impl FieldLine {
    /// Parses a status line against the fixed 9-character grammar:
    /// role char, hex type digit, hex reserved digit, 2 hex id digits,
    /// 4 hex data digits.
    pub fn parse(line: &str) -> Result<Self> {
        let text = line.trim_end_matches(['\r', '\n']);
        if text.len() != FRAME_LINE_LEN {
            return Err(Error::protocol(format!("bad line length: '{}'", text)));
        }

        let mut chars = text.chars();
        let source = chars
            .next()
            .and_then(Source::from_char)
            .ok_or_else(|| Error::protocol(format!("unknown source: '{}'", text)))?;

        // The grammar only allows uppercase hex digits
        if !text[1..].bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
            return Err(Error::protocol(format!("bad hex digits: '{}'", text)));
        }

        let type_digit = u8::from_str_radix(&text[1..2], 16)
            .map_err(|e| Error::protocol(format!("bad type digit: {}", e)))?;
        let data_id = u8::from_str_radix(&text[3..5], 16)
            .map_err(|e| Error::protocol(format!("bad data id: {}", e)))?;
        let data = u16::from_str_radix(&text[5..9], 16)
            .map_err(|e| Error::protocol(format!("bad data word: {}", e)))?;

        let (name, value) = match data_id_entry(data_id) {
            Some((name, converter)) => (Some(name), converter.convert(data)),
            None => (None, Value::Raw(data)),
        };

        Ok(FieldLine {
            line: text.to_string(),
            source,
            frame_type: FrameType::from_bits(type_digit),
            data_id,
            data,
            name,
            value,
        })
    }
}
