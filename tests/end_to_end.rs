use riverwire::envelope::{Envelope, SubMessage};
use riverwire::wire::{write_bytes_field, write_varint_field};
use riverwire::xor::ENC_TYPE_XOR;
use riverwire::{
    CommandId, Decoder, DecoderConfig, Source, Topic, Value, WireError, XorPolicy,
    build_energy_backup_command, build_set_command, parse_fields, xor_transform,
};

const SN: &str = "R631ZEB4WH000123";

fn upload(id: CommandId, pdata: Vec<u8>) -> SubMessage {
    SubMessage {
        pdata,
        src: 2,
        dest: 32,
        cmd_func: id.func,
        cmd_id: id.id,
        data_len: 0,
        device_sn: Some(SN.to_string()),
        ..Default::default()
    }
}

fn envelope(msgs: Vec<SubMessage>) -> Vec<u8> {
    Envelope { msgs }.encode()
}

fn decoder() -> Decoder {
    Decoder::new(DecoderConfig::for_device(SN))
}

#[test]
fn status_push_decodes_battery_level() {
    let mut pdata = Vec::new();
    write_varint_field(&mut pdata, 242, 85);
    let bytes = envelope(vec![upload(CommandId::DISPLAY_UPLOAD, pdata)]);

    let out = decoder().decode(Topic::Status, &bytes);
    assert_eq!(out.source, Source::Envelope);
    assert_eq!(out.params.get("254_21.bmsBattSoc"), Some(&Value::Int(85)));
}

#[test]
fn mistyped_field_does_not_hide_battery_level() {
    let mut pdata = Vec::new();
    write_varint_field(&mut pdata, 3, 250);
    write_varint_field(&mut pdata, 242, 85);
    let bytes = envelope(vec![upload(CommandId::DISPLAY_UPLOAD, pdata)]);

    let out = Decoder::default().decode(Topic::Status, &bytes);
    assert_eq!(out.params.get("254_21.bmsBattSoc"), Some(&Value::Int(85)));
}

#[test]
fn obfuscated_payload_is_restored() {
    let mut pdata = Vec::new();
    write_varint_field(&mut pdata, 242, 85);
    let seq = 0x5A5A_0107;
    let mut msg = upload(CommandId::DISPLAY_UPLOAD, xor_transform(&pdata, seq));
    msg.enc_type = ENC_TYPE_XOR;
    msg.seq = seq;
    let bytes = envelope(vec![msg]);

    let out = decoder().decode(Topic::Status, &bytes);
    assert_eq!(out.params["254_21.bmsBattSoc"], Value::Int(85));
}

#[test]
fn obfuscation_ignored_for_own_source_under_strict_policy() {
    let mut pdata = Vec::new();
    write_varint_field(&mut pdata, 242, 85);
    let mut msg = upload(CommandId::DISPLAY_UPLOAD, pdata);
    msg.enc_type = ENC_TYPE_XOR;
    msg.seq = 7;
    let bytes = envelope(vec![msg]);

    let policy = XorPolicy::FlagAndForeignSource { device_src: 2 };
    let out = Decoder::new(DecoderConfig::for_device(SN).with_xor_policy(policy))
        .decode(Topic::Status, &bytes);
    assert_eq!(out.params["254_21.bmsBattSoc"], Value::Int(85));
}

#[test]
fn other_device_contributes_nothing() {
    let mut pdata = Vec::new();
    write_varint_field(&mut pdata, 242, 40);
    let mut msg = upload(CommandId::DISPLAY_UPLOAD, pdata);
    msg.device_sn = Some("R631ZEB4WH999999".to_string());
    let bytes = envelope(vec![msg]);

    let out = decoder().decode(Topic::Status, &bytes);
    assert!(out.params.is_empty());
    assert!(out.records.is_empty());
}

#[test]
fn statistics_expand_to_named_keys() {
    let mut entry = Vec::new();
    write_varint_field(&mut entry, 1, 7);
    write_varint_field(&mut entry, 2, 123);
    let mut sum = Vec::new();
    write_bytes_field(&mut sum, 1, &entry);
    let mut pdata = Vec::new();
    write_bytes_field(&mut pdata, 270, &sum);
    let bytes = envelope(vec![upload(CommandId::DISPLAY_UPLOAD, pdata)]);

    let out = decoder().decode(Topic::Status, &bytes);
    assert_eq!(out.params["254_21.ac_out_energy"], Value::Int(123));
}

#[test]
fn raw_parser_stops_at_fixed32() {
    // 1:1, then field 2 as wire type 5, then 3:3
    let data = hex::decode("0801150000803F1803").unwrap();
    let fields = parse_fields(&data);
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[&1], 1);
}

#[test]
fn broken_payload_does_not_stop_the_rest() {
    let mut good = Vec::new();
    write_varint_field(&mut good, 26, 12);
    let bytes = envelope(vec![
        upload(CommandId::DISPLAY_UPLOAD, vec![0x90, 0x0F]),
        upload(CommandId::RUNTIME_UPLOAD, good),
    ]);

    let out = decoder().decode(Topic::Status, &bytes);
    assert_eq!(out.params.len(), 1);
    assert_eq!(out.params["254_22.bmsCycles"], Value::Int(12));
}

#[test]
fn unknown_identity_is_ignored() {
    let bytes = envelope(vec![upload(CommandId::new(32, 2), vec![0x08, 0x01])]);
    let out = decoder().decode(Topic::Status, &bytes);
    assert_eq!(out.source, Source::Envelope);
    assert!(out.params.is_empty());
}

#[test]
fn set_command_parses_back() {
    let bytes = build_set_command("en_beep", 1, "SN123", Some(2)).unwrap();
    let env = Envelope::parse(&bytes).unwrap();
    assert_eq!(env.msgs.len(), 1);

    let msg = &env.msgs[0];
    assert_eq!(msg.command_id(), CommandId::SET);
    assert_eq!(msg.data_len, 2);
    assert_eq!(msg.pdata, hex::decode("4801").unwrap());
    assert_eq!(msg.device_sn.as_deref(), Some("SN123"));
    assert!(msg.seq >= 0);
}

#[test]
fn energy_backup_shapes() {
    let on = Envelope::parse(&build_energy_backup_command(true, 30, SN, None).unwrap()).unwrap();
    assert_eq!(on.msgs[0].pdata, hex::decode("DA02040801101E").unwrap());
    assert_eq!(on.msgs[0].data_len, 7);

    let off = Envelope::parse(&build_energy_backup_command(false, 30, SN, None).unwrap()).unwrap();
    assert_eq!(off.msgs[0].pdata, hex::decode("DA0202101E").unwrap());
    assert_eq!(off.msgs[0].data_len, 5);
}

#[test]
fn echoed_set_command_updates_state_key() {
    let bytes = build_set_command("cfg_ac_out_open", 1, SN, None).unwrap();
    let out = decoder().decode(Topic::SetEcho, &bytes);
    assert_eq!(out.params["254_21.cfgAcOutOpen"], Value::Int(1));
}

#[test]
fn set_reply_needs_acknowledgement() {
    let mut ok = Vec::new();
    write_varint_field(&mut ok, 2, 1);
    write_varint_field(&mut ok, 33, 90);
    let bytes = envelope(vec![upload(CommandId::SET_REPLY, ok)]);
    let out = decoder().decode(Topic::SetReply, &bytes);
    assert_eq!(out.params["254_21.cmsMaxChgSoc"], Value::Int(90));

    let mut rejected = Vec::new();
    write_varint_field(&mut rejected, 33, 90);
    let bytes = envelope(vec![upload(CommandId::SET_REPLY, rejected)]);
    assert!(decoder().decode(Topic::SetReply, &bytes).params.is_empty());
}

#[test]
fn json_status_falls_back() {
    let body = br#"{"params":{"bmsBattSoc":85,"inv":{"acOutVol":230.5}}}"#;
    let out = decoder().decode(Topic::Status, body);
    assert_eq!(out.source, Source::Json);
    assert_eq!(out.params["bmsBattSoc"], Value::Int(85));
    assert_eq!(out.params["inv.acOutVol"], Value::Float(230.5));
}

#[test]
fn dc_output_state_is_read_only() {
    assert!(matches!(
        build_set_command("dc_out_open", 1, SN, None),
        Err(WireError::ReadOnlyField { .. })
    ));

    let mut reply = Vec::new();
    write_varint_field(&mut reply, 2, 1);
    write_varint_field(&mut reply, 74, 1);
    let bytes = envelope(vec![upload(CommandId::SET_REPLY, reply)]);
    let out = decoder().decode(Topic::SetReply, &bytes);
    assert_eq!(out.params["254_21.dcOutOpen"], Value::Int(1));
}
