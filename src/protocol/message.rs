use super::frame::{FieldLine, Source, Value};

/// Aggregated reading for one data id, up to one line per source role.
///
/// A message fills up as the decoder attaches consecutive lines sharing a
/// data id; it is flushed when a line with a different id arrives. Only
/// messages that contain the thermostat's own request are worth reporting:
/// a stream joined mid-frame produces a leading fragment without one.
#[derive(Debug, Clone, Default)]
pub struct Message {
    data_id: Option<u8>,
    thermostat: Option<FieldLine>,
    boiler_request: Option<FieldLine>,
    boiler: Option<FieldLine>,
    thermostat_answer: Option<FieldLine>,
}

impl Message {
    /// Attaches a decoded line into the slot for its role.
    ///
    /// A repeated role before the flush overwrites the earlier line; the
    /// last line of a role wins.
    pub fn attach(&mut self, field: FieldLine) {
        self.data_id = Some(field.data_id);
        match field.source {
            Source::Thermostat => self.thermostat = Some(field),
            Source::BoilerRequest => self.boiler_request = Some(field),
            Source::Boiler => self.boiler = Some(field),
            Source::ThermostatAnswer => self.thermostat_answer = Some(field),
        }
    }

    /// Data id shared by all attached lines, if any line arrived yet
    pub fn data_id(&self) -> Option<u8> {
        self.data_id
    }

    /// Table name of the reading, taken from the thermostat request line
    pub fn name(&self) -> Option<&'static str> {
        self.thermostat.as_ref().and_then(|f| f.name)
    }

    /// Whether this message qualifies for emission
    pub fn has_thermostat_request(&self) -> bool {
        self.thermostat.is_some()
    }

    /// The thermostat's request line (`T`)
    pub fn thermostat(&self) -> Option<&FieldLine> {
        self.thermostat.as_ref()
    }

    /// The request as forwarded to the boiler (`R`)
    pub fn boiler_request(&self) -> Option<&FieldLine> {
        self.boiler_request.as_ref()
    }

    /// The boiler's response line (`B`)
    pub fn boiler(&self) -> Option<&FieldLine> {
        self.boiler.as_ref()
    }

    /// The answer as returned to the thermostat (`A`)
    pub fn thermostat_answer(&self) -> Option<&FieldLine> {
        self.thermostat_answer.as_ref()
    }

    /// Decoded value reported by the boiler, the side consumers usually want
    pub fn boiler_value(&self) -> Option<&Value> {
        self.boiler.as_ref().map(|f| &f.value)
    }
}
