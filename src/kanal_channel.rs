// items that abstract kanal MPSC channels used for actor mailboxes.
// conditionally included into lib.rs depending on the tokio_kanal/tokio_flume feature.

#[cfg(feature = "tokio_flume")]
compile_error!("\"tokio_kanal\" and \"tokio_flume\" are exclusive");

use kanal::{bounded_async, AsyncSender, AsyncReceiver, SendFuture, ReceiveFuture};

pub type MpscSender<M> = AsyncSender<M>;
pub type MpscReceiver<M> = AsyncReceiver<M>;

#[inline]
pub fn channel<M>(bound: usize) -> (MpscSender<M>, MpscReceiver<M>)
where
    M: Send,
{
    bounded_async::<M>(bound)
}

#[inline]
pub fn is_disconnected<M>(tx: &MpscSender<M>) -> bool {
    tx.is_closed()
}

#[inline]
pub fn send<M>(tx: &MpscSender<M>, msg: M) -> SendFuture<'_, M> {
    tx.send(msg)
}

#[inline]
pub fn recv<M>(rx: &MpscReceiver<M>) -> ReceiveFuture<'_, M> {
    rx.recv()
}

#[inline]
pub fn try_recv<M>(rx: &MpscReceiver<M>) -> Option<M> {
    rx.try_recv().ok().flatten()
}

#[inline]
pub fn close_rx<M>(rx: &MpscReceiver<M>) {
    rx.close();
}
