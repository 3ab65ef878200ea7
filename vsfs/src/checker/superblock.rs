// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::{format, string::String};

use log::{debug, info, warn};
use vsio::prelude::*;

use super::{CappedReport, Finding, FsCheckerResult, FsRepairResult, VerifierOptionsLike, VerifyReport};
use crate::{
    session::CheckSession,
    store::BlockStore,
    types::{SuperblockField, VsfsSuperblock},
};

fn show(field: SuperblockField, value: u32) -> String {
    match field {
        SuperblockField::Magic => format!("{value:#06X}"),
        _ => format!("{value}"),
    }
}

/// Compares the nine geometry fields of block 0 with their fixed values.
pub fn check<IO: BlockIO + ?Sized, O: VerifierOptionsLike>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    opt: &O,
    rep: &mut VerifyReport,
) -> FsCheckerResult<()> {
    info!("checking superblock");

    let sb = match store.read_superblock() {
        Ok(sb) => sb,
        Err(e) => {
            warn!("superblock unreadable: {e}");
            session.superblock = None;
            session.counts.superblock += 1;
            rep.push(Finding::err("SB.IO", format!("cannot read superblock: {e}")));
            return Ok(());
        }
    };

    let mut out = CappedReport::new(rep, opt.max_findings());
    for (field, observed) in sb.mismatches() {
        debug!("superblock field {field} = {observed}");
        session.counts.superblock += 1;
        out.push(Finding::err(
            "SB.FIELD",
            format!(
                "invalid {field} ({}, expected {})",
                show(field, observed),
                show(field, field.expected())
            ),
        ));
    }
    if session.counts.superblock == 0 {
        out.always(Finding::info("SB.OK", "superblock check passed"));
    }
    out.finish("SB.MORE");

    session.superblock = Some(sb);
    Ok(())
}

/// Rewrites the geometry fields, keeping the reserved tail read by the check.
pub fn repair<IO: BlockIO + ?Sized>(
    store: &mut BlockStore<'_, IO>,
    session: &mut CheckSession,
    log: &mut VerifyReport,
) -> FsRepairResult {
    info!("fixing superblock");

    let mut sb = match session.superblock {
        Some(sb) => {
            for (field, observed) in sb.mismatches() {
                log.push(Finding::info(
                    "FIX.SB",
                    format!(
                        "reset {field}: {} -> {}",
                        show(field, observed),
                        show(field, field.expected())
                    ),
                ));
            }
            sb
        }
        None => {
            log.push(Finding::info(
                "FIX.SB",
                "superblock was unreadable, rewriting it from scratch",
            ));
            VsfsSuperblock::default()
        }
    };
    sb.reset_geometry();

    store.write_superblock(&sb)?;
    session.superblock = Some(sb);
    Ok(())
}
