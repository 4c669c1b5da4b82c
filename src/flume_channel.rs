// items that abstract flume MPSC channels used for actor mailboxes.
// conditionally included into lib.rs depending on the tokio_kanal/tokio_flume feature.

use flume::{bounded, Sender, Receiver, r#async::{SendFut, RecvFut}};

pub type MpscSender<M> = Sender<M>;
pub type MpscReceiver<M> = Receiver<M>;

#[inline]
pub fn channel<M>(bound: usize) -> (MpscSender<M>, MpscReceiver<M>)
where
    M: Send,
{
    bounded::<M>(bound)
}

#[inline]
pub fn is_disconnected<M>(tx: &MpscSender<M>) -> bool {
    tx.is_disconnected()
}

#[inline]
pub fn send<M>(tx: &MpscSender<M>, msg: M) -> SendFut<'_, M> {
    tx.send_async(msg)
}

#[inline]
pub fn recv<M>(rx: &MpscReceiver<M>) -> RecvFut<'_, M> {
    rx.recv_async()
}

#[inline]
pub fn try_recv<M>(rx: &MpscReceiver<M>) -> Option<M> {
    rx.try_recv().ok()
}

#[inline]
pub fn close_rx<M>(_rx: &MpscReceiver<M>) {
    // nop - flume receivers can't be closed explicitly; dropping all senders achieves the same effect
}
