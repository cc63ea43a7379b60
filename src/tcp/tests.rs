//! End-to-end exchanges between a sender and a receiver.

use super::*;

const RTO: u64 = 50;

fn pair(capacity: usize) -> (TcpSender, TcpReceiver) {
    let sender = TcpSender::new(65536, RTO, Some(Wrap32::new(0)));
    let receiver = TcpReceiver::new(Reassembler::new(capacity));
    (sender, receiver)
}

fn outgoing(sender: &mut TcpSender) -> Vec<TcpSenderMessage> {
    let mut segments = Vec::new();
    sender.push(|message| segments.push(message.clone()));
    segments
}

fn drain(receiver: &mut TcpReceiver) -> Vec<u8> {
    let mut out = Vec::new();
    let mut reader = receiver.reader();
    loop {
        let chunk = reader.peek().to_vec();
        if chunk.is_empty() {
            break;
        }
        reader.pop(chunk.len());
        out.extend(chunk);
    }
    out
}

#[test]
fn in_order_transfer_and_close() {
    let expected: Vec<u8> = (0..4000u32).map(|i| i as u8).collect();
    let (mut sender, mut receiver) = pair(8192);
    sender.writer().push(&expected);
    sender.writer().close();

    let mut received = Vec::new();
    loop {
        for segment in outgoing(&mut sender) {
            receiver.receive(segment);
        }
        received.extend(drain(&mut receiver));
        sender.receive(&receiver.send());
        if receiver.reassembler().output().is_closed() && sender.sequence_numbers_in_flight() == 0 {
            break;
        }
    }
    assert_eq!(received, expected);

    // SYN + 4000 bytes + FIN all acknowledged.
    let final_ack = receiver.send().ackno;
    assert_eq!(final_ack, Some(Wrap32::wrap(4002, Wrap32::new(0))));
}

#[test]
fn out_of_order_delivery() {
    let expected: Vec<u8> = (0..4000u32).map(|i| i as u8).collect();
    let (mut sender, mut receiver) = pair(8192);

    // Handshake first, so the receiver knows the ISN before data arrives
    // in reverse.
    for segment in outgoing(&mut sender) {
        receiver.receive(segment);
    }
    sender.receive(&receiver.send());

    sender.writer().push(&expected);
    sender.writer().close();
    let segments = outgoing(&mut sender);
    assert_eq!(segments.len(), 4);
    for segment in segments.into_iter().rev() {
        receiver.receive(segment);
    }

    assert_eq!(drain(&mut receiver), expected);
    assert!(receiver.reader().is_finished());
}

#[test]
fn lossy_link_with_retransmission() {
    let expected: Vec<u8> = (0..8000u32).map(|i| i as u8).collect();
    let (mut sender, mut receiver) = pair(4096);
    sender.writer().push(&expected);
    sender.writer().close();

    let mut received = Vec::new();
    while received.len() < expected.len() {
        for segment in outgoing(&mut sender) {
            if rand::random::<f32>() < 0.5 {
                receiver.receive(segment);
            }
        }
        received.extend(drain(&mut receiver));
        if rand::random::<f32>() < 0.5 {
            sender.receive(&receiver.send());
        }
        let mut retransmissions = Vec::new();
        sender.tick(RTO, |message| retransmissions.push(message.clone()));
        for segment in retransmissions {
            if rand::random::<f32>() < 0.5 {
                receiver.receive(segment);
            }
        }
    }
    assert_eq!(received, expected);
}

#[test]
fn fin_handshake_closes_the_inbound_stream() {
    let (mut sender, mut receiver) = pair(64);
    sender.writer().push(b"bye");
    sender.writer().close();

    loop {
        let segments = outgoing(&mut sender);
        let idle = segments.is_empty();
        for segment in segments {
            receiver.receive(segment);
        }
        sender.receive(&receiver.send());
        if idle && sender.sequence_numbers_in_flight() == 0 {
            break;
        }
    }

    assert_eq!(drain(&mut receiver), b"bye");
    assert!(receiver.reader().is_finished());
    // Nothing further to send once the FIN is acknowledged.
    assert!(outgoing(&mut sender).is_empty());
}

#[test]
fn receiver_window_throttles_the_sender() {
    let expected: Vec<u8> = (0..3000u32).map(|i| i as u8).collect();
    let (mut sender, mut receiver) = pair(1000);
    sender.writer().push(&expected);
    sender.writer().close();

    let mut received = Vec::new();
    let mut rounds = 0;
    while received.len() < expected.len() {
        for segment in outgoing(&mut sender) {
            // The sender never claims more than the advertised window.
            assert!(segment.sequence_length() <= 1002);
            receiver.receive(segment);
        }
        // Buffered bytes never exceed the reassembler's capacity.
        assert!(receiver.reassembler().output().bytes_buffered() <= 1000);
        received.extend(drain(&mut receiver));
        sender.receive(&receiver.send());
        rounds += 1;
        assert!(rounds < 100, "transfer failed to make progress");
    }
    assert_eq!(received, expected);
}

#[test]
fn rst_propagates_to_the_peer() {
    let (mut sender, mut receiver) = pair(64);

    // The peer declared our stream unrecoverable.
    sender.receive(&TcpReceiverMessage {
        ackno: None,
        window_size: 0,
        rst: false,
    });
    let message = sender.make_empty_message();
    assert!(message.rst);

    receiver.receive(message);
    assert!(receiver.send().rst);
}
