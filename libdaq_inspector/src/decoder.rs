use ndarray::{concatenate, ArrayView2, Axis};

use super::channel_map::ChannelMap;
use super::error::{DecoderError, FragmentError};
use super::fragment::Fragment;
use super::table::{AdcRecord, TpRow, TpTable};
use super::trigger_primitive::{ItemFormat, LegacyTp, PackedTp, TpFormat, TriggerPrimitive};
use super::wib_frame::{AdcFrame, FrontEnd, ProtoWibFrame, WibEthFrame, WibFrame};

/// Number of whole items held by a fragment after its header. Trailing bytes which do not
/// make up a full item are ignored.
pub fn item_count(fragment_size: usize, header_size: usize, item_size: usize) -> usize {
    if item_size == 0 {
        return 0;
    }
    fragment_size.saturating_sub(header_size) / item_size
}

/// Decode every item of a fragment payload in on-disk order
pub fn decode_items<F: ItemFormat>(fragment: &Fragment) -> Result<Vec<F::Output>, FragmentError> {
    let n_items = item_count(fragment.size(), fragment.header_size(), F::ITEM_SIZE);
    let mut items = Vec::with_capacity(n_items);
    for chunk in fragment.payload().chunks_exact(F::ITEM_SIZE).take(n_items) {
        items.push(F::decode(chunk)?);
    }
    Ok(items)
}

/// Report payload bytes which do not make up a whole item
fn warn_trailing_bytes(fragment: &Fragment, item_size: usize, kind: &str) {
    let trailing = fragment.payload().len() % item_size.max(1);
    if trailing != 0 {
        log::warn!(
            "Fragment payload of {} bytes does not fill whole {kind} items of {item_size} bytes, \
             ignoring the last {trailing}",
            fragment.payload().len()
        );
    }
}

fn decode_tps(
    fragment: &Fragment,
    format: TpFormat,
) -> Result<Vec<TriggerPrimitive>, FragmentError> {
    warn_trailing_bytes(fragment, format.item_size(), &format.to_string());
    match format {
        TpFormat::Legacy => decode_items::<LegacyTp>(fragment),
        TpFormat::Packed => decode_items::<PackedTp>(fragment),
    }
}

/// Decode a trigger primitive fragment into a table, resolving the plane of every channel.
///
/// Channels the map does not know keep a `None` plane and are reported in
/// `unresolved_channels`; decoding continues past them.
pub fn decode_tp_fragment(
    fragment: &Fragment,
    format: TpFormat,
    map: &ChannelMap,
) -> Result<TpTable, DecoderError> {
    let tps = decode_tps(fragment, format)?;
    let debug = log::log_enabled!(log::Level::Debug);

    let mut table = TpTable {
        source_id: Some(fragment.header().element_id),
        ..Default::default()
    };
    table.rows.reserve(tps.len());
    for tp in tps.iter() {
        if debug {
            tp.log();
        }
        let plane = map.plane(&tp.channel);
        if plane.is_none() {
            log::warn!("couldn't identify plane from offline channel {}", tp.channel);
            table.unresolved_channels.push(tp.channel);
        }
        table.rows.push(TpRow::new(tp, plane));
    }
    Ok(table)
}

fn decode_frames(
    fragment: &Fragment,
    front_end: FrontEnd,
) -> Result<Vec<AdcFrame>, FragmentError> {
    warn_trailing_bytes(fragment, front_end.frame_size(), &front_end.to_string());
    match front_end {
        FrontEnd::ProtoWib => decode_items::<ProtoWibFrame>(fragment),
        FrontEnd::Wib => decode_items::<WibFrame>(fragment),
        FrontEnd::WibEth => decode_items::<WibEthFrame>(fragment),
    }
}

/// Decode a raw WIB fragment into a (ticks x channels) ADC record.
///
/// If no front-end is given it is inferred from the fragment type. The channel columns are
/// resolved using the link address of the first frame.
pub fn decode_adc_fragment(
    fragment: &Fragment,
    front_end: Option<FrontEnd>,
    map: &ChannelMap,
) -> Result<AdcRecord, DecoderError> {
    let front_end = match front_end {
        Some(fe) => fe,
        None => FrontEnd::infer(fragment.header().fragment_type())?,
    };
    let frames = decode_frames(fragment, front_end)?;
    let first = frames.first().ok_or(DecoderError::NoFrames)?;
    let address = first.address;

    let mut channels = Vec::with_capacity(first.n_channels());
    let mut planes = Vec::with_capacity(first.n_channels());
    for column in 0..first.n_channels() {
        let link_channel = first.channel_offset + column as u16;
        let offline = map.offline_channel(&address, &link_channel);
        let plane = offline.and_then(|channel| map.plane(&channel));
        if offline.is_none() {
            log::warn!("couldn't identify offline channel for {address} channel {link_channel}");
        }
        channels.push(offline);
        planes.push(plane);
    }

    let timestamps: Vec<u64> = frames.iter().flat_map(|f| f.tick_timestamps()).collect();
    let views: Vec<ArrayView2<u16>> = frames.iter().map(|f| f.adc.view()).collect();
    let adc = concatenate(Axis(0), &views)?;

    log::debug!(
        "Decoded {} {front_end} frames from {address}: {} ticks x {} channels",
        frames.len(),
        adc.nrows(),
        adc.ncols()
    );

    Ok(AdcRecord {
        record: None,
        front_end,
        address,
        channels,
        planes,
        timestamps,
        adc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_map::{ChannelMap, ChannelMapScheme};
    use crate::constants::*;
    use crate::fragment::FragmentHeader;
    use crate::hardware_id::{LinkAddress, Plane};
    use crate::trigger_primitive::tests::{legacy_tp_bytes, sample_tp};
    use crate::wib_frame::tests::wib_frame_bytes;

    fn fragment(type_code: u32, payload: &[u8]) -> Fragment {
        let header = FragmentHeader {
            fragment_type_code: type_code,
            ..Default::default()
        };
        Fragment::from_parts(header, payload)
    }

    #[test]
    fn test_item_count() {
        assert_eq!(item_count(1048, 24, 32), 32);
        assert_eq!(item_count(1050, 24, 32), 32);
        assert_eq!(item_count(10, 24, 32), 0);
        assert_eq!(item_count(24, 24, 32), 0);
    }

    #[test]
    fn test_decode_items_ignores_trailing_bytes() {
        let mut payload = Vec::new();
        payload.extend(legacy_tp_bytes(&sample_tp(1)));
        payload.extend(legacy_tp_bytes(&sample_tp(2)));
        payload.extend([0u8; 5]);
        let frag = fragment(FRAGMENT_TYPE_TRIGGER_PRIMITIVE, &payload);
        let tps = decode_items::<LegacyTp>(&frag).unwrap();
        assert_eq!(tps.len(), 2);
        assert_eq!(tps[1], sample_tp(2));
    }

    #[test]
    fn test_decode_tp_fragment_with_unresolved_channel() {
        let map = ChannelMap::from_scheme(ChannelMapScheme::HDColdbox);
        let unmapped = 50_000;
        let mut payload = Vec::new();
        for channel in [10, unmapped, 2_000] {
            payload.extend(legacy_tp_bytes(&sample_tp(channel)));
        }
        let frag = fragment(FRAGMENT_TYPE_TRIGGER_PRIMITIVE, &payload);

        let table = decode_tp_fragment(&frag, TpFormat::Legacy, &map).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0].plane, Some(Plane::U));
        assert_eq!(table.rows[1].plane, None);
        assert_eq!(table.rows[1].channel, unmapped);
        assert_eq!(table.rows[2].plane, Some(Plane::Z));
        assert_eq!(table.unresolved_channels, vec![unmapped]);
    }

    #[test]
    fn test_decode_wib_fragment() {
        let map = ChannelMap::from_scheme(ChannelMapScheme::HDColdbox);
        let address = LinkAddress::new(1, 0, 0);
        let mut payload = Vec::new();
        for tick in 0..3u16 {
            let adc: Vec<u16> = (0..CHANNELS_PER_LINK as u16).map(|c| c + tick).collect();
            payload.extend(wib_frame_bytes(&address, 1_000 + 32 * tick as u64, &adc));
        }
        let frag = fragment(FRAGMENT_TYPE_WIB, &payload);

        let record = decode_adc_fragment(&frag, None, &map).unwrap();
        assert_eq!(record.front_end, FrontEnd::Wib);
        assert_eq!(record.n_ticks(), 3);
        assert_eq!(record.n_channels(), CHANNELS_PER_LINK);
        assert_eq!(record.timestamps, vec![1_000, 1_032, 1_064]);
        assert_eq!(record.adc[[2, 10]], 12);
        assert_eq!(record.channels[0], map.offline_channel(&address, &0));
        assert!(record.channels.iter().all(|c| c.is_some()));
    }

    #[test]
    fn test_mismatched_frames_fail_to_stack() {
        let a = ndarray::Array2::<u16>::zeros((1, 4));
        let b = ndarray::Array2::<u16>::zeros((1, 3));
        let result: Result<_, DecoderError> =
            concatenate(Axis(0), &[a.view(), b.view()]).map_err(DecoderError::from);
        assert!(matches!(result, Err(DecoderError::ShapeError(_))));
    }

    #[test]
    fn test_front_end_not_inferable() {
        let map = ChannelMap::from_scheme(ChannelMapScheme::HDColdbox);
        let frag = fragment(FRAGMENT_TYPE_TRIGGER_PRIMITIVE, &[]);
        assert!(matches!(
            decode_adc_fragment(&frag, None, &map),
            Err(DecoderError::FrontEndError(_))
        ));
        assert!(matches!(
            decode_adc_fragment(&frag, Some(FrontEnd::Wib), &map),
            Err(DecoderError::NoFrames)
        ));
    }
}
