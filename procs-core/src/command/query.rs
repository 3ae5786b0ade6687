use std::sync::Arc;

use pt::{BufferAddress, BufferUsages, FeatureName, QueryType};
use thiserror::Error;

use crate::{
    api_log,
    command::{CommandEncoderError, PassTimestampWrites},
    device::Device,
    error::{MissingFeature, ObjectError},
    global::Global,
    hub::Hub,
    id,
    resource::{resolve, QuerySet},
    storage::InvalidId,
};

/// Size in bytes of one resolved query.
pub const QUERY_SIZE: u32 = 8;

/// Required alignment of the destination offset of a query resolve.
pub const QUERY_RESOLVE_BUFFER_ALIGNMENT: BufferAddress = 256;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
    #[error("Query set has type {actual:?}, expected {expected:?}")]
    IncompatibleType { expected: QueryType, actual: QueryType },
    #[error("Query index {index} is out of bounds of a query set of size {count}")]
    OutOfBounds { index: u32, count: u32 },
    #[error("Query range {start}..{end} is out of bounds of a query set of size {count}")]
    RangeOutOfBounds { start: u32, end: u32, count: u32 },
    #[error("Beginning and end of pass timestamp write indices are the same")]
    DuplicateTimestampIndex,
    #[error("Resolve buffer lacks the usage QUERY_RESOLVE")]
    MissingResolveUsage,
    #[error("Resolve buffer offset {0} is not a multiple of {QUERY_RESOLVE_BUFFER_ALIGNMENT}")]
    UnalignedResolveOffset(BufferAddress),
    #[error("Resolving {count} queries at offset {offset} overruns a buffer of size {size}")]
    ResolveOverrun { offset: u64, count: u32, size: u64 },
    #[error("An occlusion query is already active")]
    AlreadyActive,
    #[error("Occlusion query {0} was already written in this pass")]
    QueryAlreadyWritten(u32),
    #[error("No occlusion query is active")]
    NotActive,
    #[error("Render pass has no occlusion query set")]
    MissingOcclusionQuerySet,
}

impl QuerySet {
    pub(crate) fn validate_query(&self, ty: QueryType, index: u32) -> Result<(), QueryError> {
        if self.ty != ty {
            return Err(QueryError::IncompatibleType {
                expected: ty,
                actual: self.ty,
            });
        }

        if index >= self.count {
            return Err(QueryError::OutOfBounds {
                index,
                count: self.count,
            });
        }

        Ok(())
    }
}

/// Resolve the query set of a timestamp write, checking that the device can
/// write timestamps.
pub(crate) fn resolve_timestamp_query(
    hub: &Hub,
    device: &Arc<Device>,
    query_set_id: id::QuerySetId,
    index: u32,
) -> Result<Arc<QuerySet>, QueryError> {
    device.require_feature(FeatureName::TimestampQuery)?;
    let query_set = resolve(&hub.query_sets, query_set_id, device)?;
    query_set.validate_query(QueryType::Timestamp, index)?;
    Ok(query_set)
}

/// Validate the timestamp writes of a pass descriptor.
pub(crate) fn validate_timestamp_writes(
    hub: &Hub,
    device: &Arc<Device>,
    writes: &PassTimestampWrites,
) -> Result<Arc<QuerySet>, QueryError> {
    device.require_feature(FeatureName::TimestampQuery)?;
    let query_set = resolve(&hub.query_sets, writes.query_set, device)?;

    if writes.beginning_of_pass_write_index.is_some()
        && writes.beginning_of_pass_write_index == writes.end_of_pass_write_index
    {
        return Err(QueryError::DuplicateTimestampIndex);
    }

    for index in [writes.beginning_of_pass_write_index, writes.end_of_pass_write_index]
        .into_iter()
        .flatten()
    {
        query_set.validate_query(QueryType::Timestamp, index)?;
    }

    Ok(query_set)
}

impl Global {
    pub fn command_encoder_resolve_query_set(
        &self,
        encoder_id: id::CommandEncoderId,
        query_set_id: id::QuerySetId,
        first_query: u32,
        query_count: u32,
        destination: id::BufferId,
        destination_offset: BufferAddress,
    ) -> Result<(), InvalidId> {
        api_log!(
            "CommandEncoder::resolve_query_set {encoder_id:?} {query_set_id:?} {first_query}..+{query_count} -> {destination:?} {destination_offset}"
        );

        let encoder = self.hub.command_encoders.get(encoder_id)?;

        encoder.record(|recording| {
            let query_set = resolve(&self.hub.query_sets, query_set_id, &encoder.device)?;
            let buffer = resolve(&self.hub.buffers, destination, &encoder.device)?;

            let end = first_query.saturating_add(query_count);

            if end > query_set.count {
                return Err(QueryError::RangeOutOfBounds {
                    start: first_query,
                    end,
                    count: query_set.count,
                }
                .into());
            }

            if !buffer.usage.contains(BufferUsages::QUERY_RESOLVE) {
                return Err(QueryError::MissingResolveUsage.into());
            }

            if destination_offset % QUERY_RESOLVE_BUFFER_ALIGNMENT != 0 {
                return Err(QueryError::UnalignedResolveOffset(destination_offset).into());
            }

            let bytes = query_count as u64 * QUERY_SIZE as u64;

            if destination_offset.saturating_add(bytes) > buffer.size {
                return Err(QueryError::ResolveOverrun {
                    offset: destination_offset,
                    count: query_count,
                    size: buffer.size,
                }
                .into());
            }

            recording.used.add_query_set(&query_set);
            recording.used.add_buffer(&buffer);
            Ok(())
        });

        Ok(())
    }

    pub fn command_encoder_write_timestamp(
        &self,
        encoder_id: id::CommandEncoderId,
        query_set_id: id::QuerySetId,
        query_index: u32,
    ) -> Result<(), InvalidId> {
        api_log!("CommandEncoder::write_timestamp {encoder_id:?} {query_set_id:?} {query_index}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;

        encoder.record(|recording| {
            let query_set =
                resolve_timestamp_query(&self.hub, &encoder.device, query_set_id, query_index)
                    .map_err(CommandEncoderError::Query)?;
            recording.used.add_query_set(&query_set);
            Ok(())
        });

        Ok(())
    }
}
