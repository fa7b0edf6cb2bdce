// SPDX-FileCopyrightText: 2021 Camille019
// SPDX-License-Identifier: GPL-2.0-only

use std::io::{self, Write};

use hwmon::subfeature::*;
use hwmon::{Chip, Feature, FeatureType, SubfeatureType};

use lazy_static::lazy_static;

static HYST_STR: &str = "hyst";

#[derive(Debug)]
struct SubfeatureData {
    /// Subfeature value. Not used for alarms.
    value: f64,
    /// Subfeature name
    name: &'static str,
    /// Unit to be displayed for this subfeature.
    unit: String,
}

#[derive(Debug)]
struct SubfeatureList {
    sf_type: SubfeatureType,
    /// Complementary subfeatures to be displayed if subfeature exists
    comp: Vec<SubfeatureList>,
    /// Subfeature name to be printed
    name: &'static str,
}

/// Unit prefixes, with the upper bound of the values they apply to.
const PREFIX_SCALE: [(f64, &str); 7] = [
    (1e-6, "n"),
    (1e-3, "u"),
    (1.0, "m"),
    (1e3, ""),
    (1e6, "k"),
    (1e9, "M"),
    (0.0, "G"),
];

fn scale_value(value: f64) -> (f64, &'static str) {
    let abs_value = value.abs();
    if abs_value == 0.0 {
        return (value, "");
    }

    let mut divisor = 1e-9;
    for &(upper_bound, prefix) in PREFIX_SCALE.iter() {
        if upper_bound == 0.0 || abs_value <= upper_bound {
            return (value / divisor, prefix);
        }
        divisor = upper_bound;
    }

    (value / divisor, "G")
}

fn get_label_length(chip: &Chip) -> usize {
    let max_len = chip
        .features_iter()
        .map(|feature| feature.label().len())
        .fold(11, usize::max);

    // One more for the colon, and one more to guarantee at least one
    // space between that colon and the value
    max_len + 2
}

fn print_label<W: Write>(out: &mut W, label: &str, length: usize) -> io::Result<()> {
    write!(out, "{}{:len$}", label, ":", len = length.saturating_sub(label.len()))
}

fn print_alarms<W: Write>(out: &mut W, alarms: &[SubfeatureData], leading_spaces: usize) -> io::Result<()> {
    write!(out, "{:>len$}", "ALARM", len = (leading_spaces + 7))?;

    let mut named = alarms.iter().filter(|alarm| !alarm.name.is_empty()).peekable();
    if named.peek().is_some() {
        let names: Vec<&str> = named.map(|alarm| alarm.name).collect();
        write!(out, " ({})", names.join(", "))?;
    }

    Ok(())
}

fn print_limits<W, F>(
    out: &mut W,
    limits: &[SubfeatureData],
    alarms: &[SubfeatureData],
    label_length: usize,
    fmt: F,
) -> io::Result<()>
where
    W: Write,
    F: Fn(&SubfeatureData) -> String,
{
    let mut alarms_printed = false;

    // We print limits on two columns, filling lines first, except for
    // hysteresis which must always go on the right column, with the
    // limit it relates to being in the left column on the same line.
    let mut slot = 0;
    for (i, limit) in limits.iter().enumerate() {
        if (slot & 1) != 1 {
            if slot != 0 {
                write!(out, "\n{:>len$}", "", len = (label_length + 10))?;
            }
            write!(out, "(")?;
        } else {
            write!(out, ", ")?;
        }
        write!(out, "{}", fmt(limit))?;

        let skip = match limits.get(i + 2) {
            Some(next) if next.name == HYST_STR && (slot & 1) != 1 => 1,
            _ => 0,
        };

        if ((slot + skip) & 1) == 1 || i == limits.len() - 1 {
            write!(out, ")")?;
            if !alarms.is_empty() && !alarms_printed {
                print_alarms(out, alarms, if (slot & 1) == 1 { 0 } else { 16 })?;
                alarms_printed = true;
            }
        }
        slot += skip + 1;
    }

    if !alarms.is_empty() && !alarms_printed {
        print_alarms(out, alarms, 32)?;
    }

    Ok(())
}

fn read_flag(feature: &Feature, sf_type: SubfeatureType) -> bool {
    feature
        .subfeature(sf_type)
        .and_then(|sf| sf.read_value().ok())
        .map(|val| val != 0.0)
        .unwrap_or(false)
}

fn read_value(feature: &Feature, sf_type: SubfeatureType) -> Option<f64> {
    feature.subfeature(sf_type).and_then(|sf| sf.read_value().ok())
}

fn get_sensor_limit_data(
    feature: &Feature,
    sfl_vec: &[SubfeatureList],
    limits: &mut Vec<SubfeatureData>,
    alarms: &mut Vec<SubfeatureData>,
) {
    for sfl in sfl_vec.iter() {
        if let Some(value) = read_value(feature, sfl.sf_type) {
            let data = SubfeatureData {
                value,
                name: sfl.name,
                unit: String::new(),
            };

            if sfl.sf_type.is_alarm() {
                // Only queue alarm subfeatures if the alarm
                // is active, and don't store the alarm value
                // (it is implied to be active if queued).
                if value != 0.0 {
                    alarms.push(data);
                }
            } else {
                // Always queue limit subfeatures with their value.
                limits.push(data);
            }
            get_sensor_limit_data(feature, &sfl.comp, limits, alarms);
        }
    }
}

fn print_feature_fan<W: Write>(out: &mut W, feature: &Feature, label_length: usize) -> io::Result<()> {
    print_label(out, &feature.label(), label_length)?;

    if read_flag(feature, SubfeatureType::Fan(Fan::Fault)) {
        write!(out, "   FAULT")?;
    } else if let Some(input) = read_value(feature, SubfeatureType::Fan(Fan::Input)) {
        write!(out, "{:4.0} RPM", input)?;
    } else {
        write!(out, "     N/A")?;
    }

    let limits: Vec<String> = [
        read_value(feature, SubfeatureType::Fan(Fan::Min)).map(|v| format!("min = {:4.0} RPM", v)),
        read_value(feature, SubfeatureType::Fan(Fan::Max)).map(|v| format!("max = {:4.0} RPM", v)),
        read_value(feature, SubfeatureType::Fan(Fan::Div)).map(|v| format!("div = {:1.0}", v)),
    ]
    .into_iter()
    .flatten()
    .collect();

    if !limits.is_empty() {
        write!(out, "  ({})", limits.join(", "))?;
    }

    if read_flag(feature, SubfeatureType::Fan(Fan::Alarm))
        || read_flag(feature, SubfeatureType::Fan(Fan::Min_Alarm))
        || read_flag(feature, SubfeatureType::Fan(Fan::Max_Alarm))
    {
        write!(out, "  ALARM")?;
    }

    writeln!(out)
}

macro_rules! make_sflist_item {
    (feature: $Feature:ident, properties: { $SfType:ident } ) => {
        SubfeatureList {
            sf_type: SubfeatureType::$Feature($Feature::$SfType),
            name: "",
            comp: Vec::new(),
        }
    };
    (feature: $Feature:ident, properties: { $SfType:ident, $name:expr } ) => {
        SubfeatureList {
            sf_type: SubfeatureType::$Feature($Feature::$SfType),
            name: $name,
            comp: Vec::new(),
        }
    };
    (feature: $Feature:ident, properties: { $SfType:ident, $name:expr, $comp:tt }) => {
        SubfeatureList {
            sf_type: SubfeatureType::$Feature($Feature::$SfType),
            name: $name,
            comp: make_sflist! {
                feature: $Feature,
                list = $comp
            },
        }
    };
}

macro_rules! make_sflist {
    (feature: $Feature:ident, list = [ $($properties:tt),* $(,)* ] ) => {
        vec![
            $(make_sflist_item!{
                feature: $Feature,
                properties: $properties
            },)*
        ]
    };
}

lazy_static! {
    static ref TEMP_SENSORS: Vec<SubfeatureList> = make_sflist! {
        feature: Temperature,
        list = [
            { Alarm },
            { Crit_Min_Alarm, "LCRIT" },
            { Min_Alarm, "LOW" },
            { Max_Alarm, "HIGH" },
            { Crit_Max_Alarm, "CRIT" },
            { Emergency_Alarm, "EMERGENCY" },
            { Min, "low", [ {Min_Hyst, HYST_STR} ] },
            { Max, "high", [ {Max_Hyst, HYST_STR} ] },
            { Crit_Min, "crit low", [ {Crit_Min_Hyst, HYST_STR} ] },
            { Crit_Max, "crit", [ {Crit_Max_Hyst, HYST_STR} ] },
            { Emergency, "emerg" , [ {Emergency_Hyst, HYST_STR} ] },
            { Lowest, "lowest" },
            { Highest, "highest" },
        ]
    };
}

fn temp_unit(fahrenheit: bool) -> &'static str {
    if fahrenheit {
        "°F"
    } else {
        "°C"
    }
}

fn convert_temp(celsius: f64, fahrenheit: bool) -> f64 {
    if fahrenheit {
        celsius * 9.0 / 5.0 + 32.0
    } else {
        celsius
    }
}

fn sensor_type_name(sens: f64) -> &'static str {
    let mut sens = sens as i32;

    // older kernels / drivers sometimes report a beta value for thermistors
    if sens > 1000 {
        sens = 4;
    }

    match sens {
        0 => "disabled",
        1 => "CPU diode",
        2 => "transistor",
        3 => "thermal diode",
        4 => "thermistor",
        5 => "AMD AMDSI",
        6 => "Intel PECI",
        _ => "unknown",
    }
}

fn print_feature_temp<W: Write>(
    out: &mut W,
    feature: &Feature,
    label_length: usize,
    fahrenheit: bool,
) -> io::Result<()> {
    print_label(out, &feature.label(), label_length)?;

    let unit = temp_unit(fahrenheit);
    if read_flag(feature, SubfeatureType::Temperature(Temperature::Fault)) {
        write!(out, "   FAULT  ")?;
    } else if let Some(input) = read_value(feature, SubfeatureType::Temperature(Temperature::Input)) {
        write!(out, "{:+6.1}{}  ", convert_temp(input, fahrenheit), unit)?;
    } else {
        write!(out, "     N/A  ")?;
    }

    let mut alarms = Vec::new();
    let mut sensors = Vec::new();
    get_sensor_limit_data(feature, &TEMP_SENSORS, &mut sensors, &mut alarms);

    for sens in sensors.iter_mut() {
        sens.value = convert_temp(sens.value, fahrenheit);
    }

    print_limits(out, &sensors, &alarms, label_length, |limit| {
        format!("{:<4} = {:+5.1}{}", limit.name, limit.value, unit)
    })?;

    if let Some(sens) = read_value(feature, SubfeatureType::Temperature(Temperature::Type)) {
        write!(out, "  sensor = {}", sensor_type_name(sens))?;
    }

    writeln!(out)
}

lazy_static! {
    static ref VOLTAGE_SENSORS: Vec<SubfeatureList> = make_sflist! {
        feature: Voltage,
        list = [
            { Alarm },
            { Crit_Min_Alarm, "LCRIT" },
            { Min_Alarm, "MIN" },
            { Max_Alarm, "MAX" },
            { Crit_Max_Alarm, "CRIT" },
            { Crit_Min, "crit min" },
            { Min, "min" },
            { Max, "max" },
            { Crit_Max, "crit max" },
            { Average, "avg" },
            { Lowest, "lowest" },
            { Highest, "highest" },
        ]
    };
}

/// Voltages and currents share their layout, only the unit differs.
fn print_feature_electric<W: Write>(
    out: &mut W,
    feature: &Feature,
    label_length: usize,
    wrap: fn(Voltage) -> SubfeatureType,
    unit: &str,
) -> io::Result<()> {
    print_label(out, &feature.label(), label_length)?;

    if let Some(input) = read_value(feature, wrap(Voltage::Input)) {
        write!(out, "{:+6.2} {}  ", input, unit)?;
    } else {
        write!(out, "     N/A  ")?;
    }

    let list: Vec<SubfeatureList> = VOLTAGE_SENSORS
        .iter()
        .map(|sfl| SubfeatureList {
            sf_type: match sfl.sf_type {
                SubfeatureType::Voltage(sft) => wrap(sft),
                other => other,
            },
            comp: Vec::new(),
            name: sfl.name,
        })
        .collect();

    let mut alarms = Vec::new();
    let mut sensors = Vec::new();
    get_sensor_limit_data(feature, &list, &mut sensors, &mut alarms);

    print_limits(out, &sensors, &alarms, label_length, |limit| {
        format!("{} = {:+6.2} {}", limit.name, limit.value, unit)
    })?;

    writeln!(out)
}

lazy_static! {
    static ref POWER_COMMON_SENSORS: Vec<SubfeatureList> = make_sflist! {
        feature: Power,
        list = [
            { Alarm },
            { Min_Alarm, "MIN" },
            { Max_Alarm, "MAX" },
            { Crit_Min_Alarm, "LCRIT" },
            { Crit_Max_Alarm, "CRIT" },
            { Cap_Alarm, "CAP" },
            { Max, "max" },
            { Min, "min" },
            { Crit_Min, "lcrit" },
            { Crit_Max, "crit" },
            { Cap, "cap" },
        ]
    };
    static ref POWER_INST_SENSORS: Vec<SubfeatureList> = make_sflist! {
        feature: Power,
        list = [
            { Input_Lowest, "lowest" },
            { Input_Highest, "highest" },
            { Average, "avg" },
            { Average_Lowest, "avg lowest" },
            { Average_Highest, "avg highest" },
            { Average_Interval, "interval" },
        ]
    };
    static ref POWER_AVG_SENSORS: Vec<SubfeatureList> = make_sflist! {
        feature: Power,
        list = [
            { Average_Lowest, "lowest" },
            { Average_Highest, "highest" },
            { Average_Interval, "interval" },
        ]
    };
}

fn print_feature_power<W: Write>(out: &mut W, feature: &Feature, label_length: usize) -> io::Result<()> {
    print_label(out, &feature.label(), label_length)?;

    let mut alarms = Vec::new();
    let mut sensors = Vec::new();

    // Power sensors come in 2 flavors: instantaneous and averaged.
    // Most devices only support one flavor, so we try to display the
    // average power if the instantaneous power attribute does not exist.
    // If both instantaneous power and average power are supported,
    // average power is displayed as limit.
    let mut value = read_value(feature, SubfeatureType::Power(Power::Input));

    if value.is_some() {
        get_sensor_limit_data(feature, &POWER_INST_SENSORS, &mut sensors, &mut alarms);
    } else {
        get_sensor_limit_data(feature, &POWER_AVG_SENSORS, &mut sensors, &mut alarms);
        value = read_value(feature, SubfeatureType::Power(Power::Average));
    }
    // Add sensors common to both flavors.
    get_sensor_limit_data(feature, &POWER_COMMON_SENSORS, &mut sensors, &mut alarms);

    if let Some(value) = value {
        let (value, prefix) = scale_value(value);
        write!(out, "{:6.2} {}{:len$}", value, prefix, "W", len = (3 - prefix.len()))?;
    } else {
        write!(out, "     N/A  ")?;
    }

    for sens in sensors.iter_mut() {
        // Unit is W and needs to be scaled for all attributes except
        // interval, which does not need to be scaled and is reported in
        // seconds.
        if sens.name != "interval" {
            let (value, prefix) = scale_value(sens.value);
            sens.value = value;
            sens.unit = format!("{}W", prefix);
        } else {
            sens.unit = String::from("s");
        }
    }

    print_limits(out, &sensors, &alarms, label_length, |limit| {
        format!("{} = {:6.2} {}", limit.name, limit.value, limit.unit)
    })?;

    writeln!(out)
}

fn print_feature_energy<W: Write>(out: &mut W, feature: &Feature, label_length: usize) -> io::Result<()> {
    print_label(out, &feature.label(), label_length)?;

    match read_value(feature, SubfeatureType::Energy(Energy::Input)) {
        Some(value) => {
            let (value, prefix) = scale_value(value);
            writeln!(out, "{:6.2} {}J", value, prefix)
        }
        None => writeln!(out, "     N/A"),
    }
}

fn print_feature_humidity<W: Write>(out: &mut W, feature: &Feature, label_length: usize) -> io::Result<()> {
    if let Some(value) = read_value(feature, SubfeatureType::Humidity(Humidity::Input)) {
        print_label(out, &feature.label(), label_length)?;
        writeln!(out, "{:6.1} %RH", value)?;
    }
    Ok(())
}

fn print_feature_cpu<W: Write>(out: &mut W, feature: &Feature, label_length: usize) -> io::Result<()> {
    if let Some(value) = read_value(feature, SubfeatureType::Cpu) {
        print_label(out, &feature.label(), label_length)?;
        writeln!(out, "{:+6.3} V", value)?;
    }
    Ok(())
}

fn print_feature_flag<W: Write>(
    out: &mut W,
    feature: &Feature,
    label_length: usize,
    sf_type: SubfeatureType,
    states: (&str, &str),
) -> io::Result<()> {
    if let Some(value) = read_value(feature, sf_type) {
        print_label(out, &feature.label(), label_length)?;
        let state = if value == 0.0 { states.0 } else { states.1 };
        writeln!(out, "{}", state)?;
    }
    Ok(())
}

/// Render every feature of `chip` the way the chip driver documents it.
pub fn print_chip<W: Write>(out: &mut W, chip: &Chip, fahrenheit: bool) -> io::Result<()> {
    let label_length = get_label_length(chip);

    for feature in chip.features_iter() {
        match feature.get_type() {
            FeatureType::Fan => print_feature_fan(out, feature, label_length)?,
            FeatureType::Temperature => print_feature_temp(out, feature, label_length, fahrenheit)?,
            FeatureType::Voltage => {
                print_feature_electric(out, feature, label_length, SubfeatureType::Voltage, "V")?
            }
            FeatureType::Current => {
                print_feature_electric(out, feature, label_length, SubfeatureType::Current, "A")?
            }
            FeatureType::Power => print_feature_power(out, feature, label_length)?,
            FeatureType::Energy => print_feature_energy(out, feature, label_length)?,
            FeatureType::Humidity => print_feature_humidity(out, feature, label_length)?,
            FeatureType::Cpu => print_feature_cpu(out, feature, label_length)?,
            FeatureType::Intrusion => print_feature_flag(
                out,
                feature,
                label_length,
                SubfeatureType::Intrusion(Intrusion::Alarm),
                ("OK", "ALARM"),
            )?,
            FeatureType::BeepEnable => print_feature_flag(
                out,
                feature,
                label_length,
                SubfeatureType::BeepEnable,
                ("disabled", "enabled"),
            )?,
        }
    }

    Ok(())
}

/// Dump every readable subfeature of `chip` without interpretation.
pub fn print_chip_raw<W: Write, E: Write>(out: &mut W, err: &mut E, chip: &Chip) -> io::Result<()> {
    for feature in chip.features_iter() {
        writeln!(out, "{}:", feature.label())?;

        for subfeature in feature.subfeatures_iter().filter(|sf| sf.is_readable()) {
            match subfeature.read_value() {
                Ok(value) => writeln!(out, "  {}: {:.3}", subfeature.name(), value)?,
                Err(e) => writeln!(err, "ERROR: Can't get value of subfeature {}: {}", subfeature.name(), e)?,
            }
        }
    }

    Ok(())
}
