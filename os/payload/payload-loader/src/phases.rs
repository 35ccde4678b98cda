//! # Boot-Phase Sequencing

use crate::config::DebugLevel;
use crate::device_tree::build_device_tree;
use crate::fit::{LoadedImage, SectionSource, load_payload};
use crate::memory::PageAllocator;
use log::{error, info};
use payload_addresses::PhysicalAddress;
use payload_handoff::HandoffList;
use uefi::Status;

/// Notification plumbing of the surrounding firmware.
pub trait PhaseSignals {
    /// Registers interest in the end of the current boot phase, so that
    /// [`FitPayloadLoader::end_of_phase`] gets called.
    ///
    /// # Errors
    /// The firmware's status if the notification could not be registered.
    fn arm_end_of_phase(&mut self) -> Result<(), Status>;

    /// Announces that the payload is about to run, so that
    /// [`FitPayloadLoader::ready_to_payload`] gets called.
    ///
    /// # Errors
    /// The firmware's status if the signal could not be raised.
    fn raise_ready_to_payload(&mut self) -> Result<(), Status>;
}

/// The loader module as the firmware sees it.
#[derive(Debug, Default)]
pub struct FitPayloadLoader {
    end_of_phase_armed: bool,
    loaded: Option<LoadedImage>,
    device_tree: Option<PhysicalAddress>,
}

impl FitPayloadLoader {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            end_of_phase_armed: false,
            loaded: None,
            device_tree: None,
        }
    }

    /// Loads the payload out of `sections` and arms the end-of-phase signal.
    ///
    /// # Errors
    /// The status of the failed load; nothing is armed in that case.
    pub fn load_file<S, A, P>(
        &mut self,
        sections: &S,
        allocator: &mut A,
        signals: &mut P,
    ) -> Result<LoadedImage, Status>
    where
        S: SectionSource + ?Sized,
        A: PageAllocator + ?Sized,
        P: PhaseSignals + ?Sized,
    {
        let image = load_payload(sections, allocator).map_err(|err| {
            error!("Failed to load the FIT payload: {err}");
            Status::from(err)
        })?;

        // The image is in place either way; a missing notification only
        // means no device tree will be built.
        match signals.arm_end_of_phase() {
            Ok(()) => self.end_of_phase_armed = true,
            Err(status) => error!("Failed to arm the end-of-phase signal: {status:?}"),
        }

        self.loaded = Some(image);
        Ok(image)
    }

    /// Raises ready-to-payload once for each armed end-of-phase.
    ///
    /// # Errors
    /// The status returned by [`PhaseSignals::raise_ready_to_payload`].
    pub fn end_of_phase<P>(&mut self, signals: &mut P) -> Result<(), Status>
    where
        P: PhaseSignals + ?Sized,
    {
        if !core::mem::take(&mut self.end_of_phase_armed) {
            return Ok(());
        }
        signals.raise_ready_to_payload()
    }

    /// Builds the device tree and publishes it to the hand-off list.
    ///
    /// # Errors
    /// The status of the failed build.
    ///
    /// # Panics
    /// If the hand-off list lacks the ACPI or CPU record, or the tree
    /// outgrows its fixed buffer.
    pub fn ready_to_payload<H, A>(
        &mut self,
        records: &mut H,
        allocator: &mut A,
        debug_level: DebugLevel,
    ) -> Result<PhysicalAddress, Status>
    where
        H: HandoffList + ?Sized,
        A: PageAllocator + ?Sized,
    {
        let address = build_device_tree(records, allocator, debug_level).map_err(|err| {
            error!("Failed to build the device tree: {err}");
            Status::from(err)
        })?;
        info!("Device tree for the payload is at {address}");
        self.device_tree = Some(address);
        Ok(address)
    }

    /// The most recently loaded payload.
    #[must_use]
    pub const fn loaded_image(&self) -> Option<LoadedImage> {
        self.loaded
    }

    /// The most recently published device tree.
    #[must_use]
    pub const fn device_tree(&self) -> Option<PhysicalAddress> {
        self.device_tree
    }
}
